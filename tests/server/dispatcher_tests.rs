//! Debounced rebuild dispatch driving real incremental builds

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jet_engine::build::IncrementalBuilder;
use jet_engine::server::{BuildDispatcher, DispatchState, RebuildExecutor};
use jet_engine::{build_all, Result};

use crate::common::sample_repo;

/// Counts calls before handing them to the real builder
struct Recording {
    inner: IncrementalBuilder,
    files: AtomicUsize,
    full: AtomicUsize,
}

#[async_trait]
impl RebuildExecutor for Recording {
    async fn rebuild_file(&self, path: &Path) -> Result<()> {
        self.files.fetch_add(1, Ordering::SeqCst);
        self.inner.rebuild_file(path).await
    }

    async fn rebuild_all(&self) -> Result<()> {
        self.full.fetch_add(1, Ordering::SeqCst);
        self.inner.rebuild_all().await
    }
}

async fn wait_idle(dispatcher: &BuildDispatcher) {
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if dispatcher.state() == DispatchState::Idle {
            return;
        }
    }
    panic!("dispatcher never returned to idle");
}

#[tokio::test]
async fn test_single_change_rebuilds_one_file() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let recording = Arc::new(Recording {
        inner: IncrementalBuilder::new(ctx.clone()),
        files: AtomicUsize::new(0),
        full: AtomicUsize::new(0),
    });
    let dispatcher = BuildDispatcher::new(recording.clone(), Duration::from_millis(50)).unwrap();

    repo.add_file("app/util.js", "define(['lib/core'], function () {});\n");
    dispatcher.notify(repo.src().join("app/util.js"));
    assert_eq!(dispatcher.state(), DispatchState::Queued);
    wait_idle(&dispatcher).await;

    assert_eq!(recording.files.load(Ordering::SeqCst), 1);
    assert_eq!(recording.full.load(Ordering::SeqCst), 0);
    let util = ctx.cache().get("app").await.get("app/util").cloned().unwrap();
    assert_eq!(util.sync_deps, vec!["lib/core"]);
}

#[tokio::test]
async fn test_burst_of_changes_triggers_one_full_build() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);

    let recording = Arc::new(Recording {
        inner: IncrementalBuilder::new(ctx.clone()),
        files: AtomicUsize::new(0),
        full: AtomicUsize::new(0),
    });
    let dispatcher = BuildDispatcher::new(recording.clone(), Duration::from_millis(50)).unwrap();

    for file in ["app/main.js", "app/util.js", "app/lazy.js", "lib/core.js", "lib/helper.js"] {
        dispatcher.notify(repo.src().join(file));
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    wait_idle(&dispatcher).await;

    assert_eq!(recording.full.load(Ordering::SeqCst), 1);
    assert_eq!(recording.files.load(Ordering::SeqCst), 0);
    assert_eq!(repo.package_map("lib").len(), 2);
}

#[tokio::test]
async fn test_deleted_file_triggers_full_build() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let recording = Arc::new(Recording {
        inner: IncrementalBuilder::new(ctx.clone()),
        files: AtomicUsize::new(0),
        full: AtomicUsize::new(0),
    });
    let dispatcher = BuildDispatcher::new(recording.clone(), Duration::from_millis(50)).unwrap();

    repo.remove_file("app/lazy.js");
    dispatcher.notify(repo.src().join("app/lazy.js"));
    wait_idle(&dispatcher).await;

    assert_eq!(recording.full.load(Ordering::SeqCst), 1);
    assert!(!repo.package_map("app").contains("app/lazy"));
}
