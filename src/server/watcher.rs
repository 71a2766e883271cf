//! File system watcher feeding the build dispatcher
//!
//! Uses `notify` (through `notify-debouncer-mini`, with a short window that
//! only folds duplicate OS events) to watch the source root recursively.
//! Changes to eligible source files of watched packages are forwarded to the
//! [`BuildDispatcher`], which owns the real debounce window.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐
//! │   notify    │────>│  debouncer  │────>│ BuildDispatcher │
//! │   watcher   │     │   (20ms)    │     │    (300ms)      │
//! └─────────────┘     └─────────────┘     └─────────────────┘
//! ```

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};

use crate::build::walk::derive_ids;
use crate::error::Result;
use crate::fs_utils::to_slash;

use super::dispatcher::BuildDispatcher;

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Window for folding duplicate OS events (default: 20ms)
    pub event_window: Duration,
    /// Packages whose files are watched (empty = all)
    pub packages: Vec<String>,
    pub base_id: String,
    pub extension: String,
    /// Directories whose changes are ignored (artifact and map output)
    pub exclude: Vec<PathBuf>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            event_window: Duration::from_millis(20),
            packages: Vec::new(),
            base_id: String::new(),
            extension: "js".to_string(),
            exclude: Vec::new(),
        }
    }
}

/// Watches a source root and reports changed sources
pub struct FileWatcher {
    src_root: PathBuf,
    config: WatcherConfig,
    running: Arc<AtomicBool>,
}

impl FileWatcher {
    pub fn new(src_root: PathBuf, config: WatcherConfig) -> Self {
        Self {
            src_root,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start watching; changes are forwarded to `dispatcher` until the
    /// returned handle is stopped or dropped.
    pub fn start(&self, dispatcher: BuildDispatcher) -> Result<WatcherHandle> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(WatcherHandle {
                running: Arc::clone(&self.running),
            });
        }

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer(self.config.event_window, tx)?;
        debouncer
            .watcher()
            .watch(&self.src_root, RecursiveMode::Recursive)?;
        tracing::info!("[WATCHER] Watching {}", self.src_root.display());

        let src_root = self.src_root.clone();
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(Ok(events)) => {
                        for event in events {
                            if !matches!(event.kind, DebouncedEventKind::Any) {
                                continue;
                            }
                            if should_watch_path(&event.path, &src_root, &config) {
                                tracing::debug!("[WATCHER] Changed: {}", event.path.display());
                                dispatcher.notify(event.path);
                            }
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::error!("[WATCHER] Watch error: {:?}", e);
                    }
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }

            // The debouncer stops emitting once dropped
            drop(debouncer);
            tracing::info!("[WATCHER] Stopped");
        });

        Ok(WatcherHandle {
            running: Arc::clone(&self.running),
        })
    }
}

/// Whether a change to `path` concerns a watched source file
fn should_watch_path(path: &Path, src_root: &Path, config: &WatcherConfig) -> bool {
    if config.exclude.iter().any(|ex| path.starts_with(ex)) {
        return false;
    }
    let Ok(rel) = path.strip_prefix(src_root) else {
        return false;
    };

    let hidden = rel.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    });
    if hidden {
        return false;
    }

    match derive_ids(&to_slash(rel), &config.base_id, &config.extension) {
        Some((_, package)) => config.packages.is_empty() || config.packages.contains(&package),
        None => false,
    }
}

/// Handle for controlling a running watcher
pub struct WatcherHandle {
    running: Arc<AtomicBool>,
}

impl WatcherHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
