//! Dev server: combo bundles over HTTP plus incremental rebuilds
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────────── JetContext ───────────────────────────┐
//!  HTTP ──> http ──>  │ ComboService ──> Resolver ──> ModuleCache ──> MapStore / Remote   │
//!                     │                                    ^                              │
//!  fs ──> FileWatcher │──> BuildDispatcher ──> IncrementalBuilder ──> BuildPipeline       │
//!                     └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `combo` - bundle and dependency operations
//! - `http` - axum routes
//! - `dispatcher` - debounced single-flight rebuilds
//! - `watcher` - file system watching

pub mod combo;
pub mod dispatcher;
pub mod http;
pub mod watcher;

pub use combo::{parse_combo_query, ComboService, DepsQuery, DepsResponse};
pub use dispatcher::{BuildDispatcher, DispatchState, RebuildExecutor};
pub use http::{router, serve};
pub use watcher::{FileWatcher, WatcherConfig, WatcherHandle};
