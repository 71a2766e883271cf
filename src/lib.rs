//! jet: build backend and combo server for AMD JavaScript packages
//!
//! Source trees are split into packages (top-level directories or files of
//! the source root). A build compiles every module of the selected packages
//! in parallel into content-addressed artifacts and records, per package, a
//! map from module id to artifact path and dependencies. The dev server reads
//! those maps through a TTL cache, resolves dependency closures, concatenates
//! artifacts into combo bundles, and rebuilds incrementally as files change.
//!
//! # Example
//!
//! ```ignore
//! use jet_engine::{build_all, JetConfig, JetContext};
//! use std::path::Path;
//!
//! let mut config = JetConfig::for_source(Path::new("/work/src"))?;
//! config.build.packages = vec!["app".into()];
//! config.resolve_packages()?;
//!
//! let ctx = JetContext::new(config);
//! let (infos, report) = build_all(ctx.pipeline(), ctx.store())?;
//! println!("{} modules", report.modules);
//! ```

pub mod analyzer;
pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod fs_utils;
pub mod module_cache;
pub mod remote;
pub mod resolver;
pub mod schema;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use analyzer::{AnalyzeOptions, Analysis, DefineAnalyzer, ModuleDefinition, SourceAnalyzer};
pub use build::{build_all, BuildOptions, BuildPipeline, BuildReport, HashAlgorithm, IncrementalBuilder};
pub use cli::{Cli, Commands};
pub use config::JetConfig;
pub use context::JetContext;
pub use error::{BuildFailure, JetError, Result};
pub use module_cache::{MissingPackageHandler, ModuleCache};
pub use remote::{RemoteFile, RemoteLoader};
pub use resolver::Resolver;
pub use schema::{BuildResult, ModuleEntry, PackInfos, PackageMap};
pub use store::MapStore;
