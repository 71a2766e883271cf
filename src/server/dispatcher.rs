//! Coalescing file changes into rebuilds
//!
//! Changed paths are queued and a debounce timer is (re)armed on every
//! change. When the timer fires and no build is running, the whole queue is
//! taken at once:
//!
//! - exactly one path that still exists: rebuild that file
//! - anything else (several paths, or a deletion): rebuild everything
//!
//! Paths arriving during a build stay queued. When the build finishes, the
//! queue is checked again right away, so at most one build runs at a time
//! and no change is lost.
//!
//! ```text
//!   notify ──> [queued] ──timer──> [compiling] ──done──> queue empty? ──> [idle]
//!                 ^                     │                     │ no
//!                 └─────── notify ──────┘                     └──> [compiling]
//! ```

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{JetError, Result};

/// What the dispatcher runs once a batch of changes is ready
#[async_trait]
pub trait RebuildExecutor: Send + Sync + 'static {
    /// Recompile one file and merge its modules into its package map
    async fn rebuild_file(&self, path: &Path) -> Result<()>;

    /// Recompile every watched package
    async fn rebuild_all(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Queued,
    Compiling,
}

#[derive(Default)]
struct Queue {
    pending: HashSet<PathBuf>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every change; a timer only fires if it is still current
    generation: u64,
    compiling: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    executor: Arc<dyn RebuildExecutor>,
    debounce: Duration,
    runtime: Handle,
}

/// Debounced, single-flight rebuild scheduler
#[derive(Clone)]
pub struct BuildDispatcher {
    shared: Arc<Shared>,
}

impl BuildDispatcher {
    /// Create a dispatcher bound to the current tokio runtime
    pub fn new(executor: Arc<dyn RebuildExecutor>, debounce: Duration) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| JetError::config(format!("build dispatcher needs a tokio runtime: {}", e)))?;
        Ok(Self::with_runtime(executor, debounce, runtime))
    }

    pub fn with_runtime(executor: Arc<dyn RebuildExecutor>, debounce: Duration, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                executor,
                debounce,
                runtime,
            }),
        }
    }

    /// Record a changed path and restart the debounce window.
    ///
    /// Safe to call from any thread.
    pub fn notify(&self, path: PathBuf) {
        let mut queue = self.shared.queue.lock();
        queue.pending.insert(path);
        queue.generation += 1;
        if let Some(timer) = queue.timer.take() {
            timer.abort();
        }

        let shared = Arc::clone(&self.shared);
        let generation = queue.generation;
        let debounce = self.shared.debounce;
        queue.timer = Some(self.shared.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            Shared::on_timer(shared, generation);
        }));
    }

    pub fn state(&self) -> DispatchState {
        let queue = self.shared.queue.lock();
        if queue.compiling {
            DispatchState::Compiling
        } else if !queue.pending.is_empty() {
            DispatchState::Queued
        } else {
            DispatchState::Idle
        }
    }

    pub fn pending(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }
}

impl Shared {
    fn on_timer(shared: Arc<Shared>, generation: u64) {
        {
            let mut queue = shared.queue.lock();
            if queue.generation != generation {
                return;
            }
            queue.timer = None;
            if queue.compiling {
                // The running build drains the queue when it finishes
                return;
            }
            queue.compiling = true;
        }

        let runtime = shared.runtime.clone();
        runtime.spawn(Shared::drain(shared));
    }

    async fn drain(shared: Arc<Shared>) {
        loop {
            let batch = {
                let mut queue = shared.queue.lock();
                if queue.pending.is_empty() {
                    queue.compiling = false;
                    return;
                }
                std::mem::take(&mut queue.pending)
            };

            let outcome = AssertUnwindSafe(shared.run_batch(batch)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("[DISPATCH] Rebuild failed: {}", e),
                Err(_) => tracing::error!("[DISPATCH] Rebuild panicked"),
            }
        }
    }

    async fn run_batch(&self, batch: HashSet<PathBuf>) -> Result<()> {
        let single = if batch.len() == 1 {
            batch.into_iter().next().filter(|path| path.exists())
        } else {
            tracing::info!("[DISPATCH] {} changes queued, rebuilding everything", batch.len());
            None
        };

        match single {
            Some(path) => {
                tracing::info!("[DISPATCH] Rebuilding {}", path.display());
                self.executor.rebuild_file(&path).await
            }
            None => self.executor.rebuild_all().await,
        }
    }
}
