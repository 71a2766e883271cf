//! Single-file and full rebuilds as the dev server runs them

use jet_engine::build::IncrementalBuilder;
use jet_engine::build_all;
use jet_engine::server::RebuildExecutor;

use crate::common::{sample_repo, TestRepo};

#[tokio::test]
async fn test_rebuild_file_updates_map_and_cache() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();
    let builder = IncrementalBuilder::new(ctx.clone());

    // Warm the cache with the original map
    assert!(ctx.cache().get("app").await.get("app/util").unwrap().sync_deps.is_empty());

    repo.add_file("app/util.js", "define(['lib/helper'], function () {});\n");
    builder.rebuild_file(&repo.src().join("app/util.js")).await.unwrap();

    let persisted = repo.package_map("app");
    assert_eq!(persisted.get("app/util").unwrap().sync_deps, vec!["lib/helper"]);
    assert!(persisted.contains("app/main"));
    assert_eq!(persisted.len(), 3);

    let cached = ctx.cache().get("app").await;
    assert_eq!(cached.get("app/util").unwrap().sync_deps, vec!["lib/helper"]);
}

#[tokio::test]
async fn test_redefinition_across_builds_keeps_latest() {
    let repo = TestRepo::new();
    repo.add_file("app/a.js", "define('app/shared', [], function () { return 'a'; });\n");
    let ctx = repo.context(&["app"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();
    assert_eq!(repo.package_map("app").get("app/shared").unwrap().path, "app/a.js");

    repo.remove_file("app/a.js")
        .add_file("app/b.js", "define('app/shared', [], function () { return 'b'; });\n");
    let builder = IncrementalBuilder::new(ctx.clone());
    builder.rebuild_file(&repo.src().join("app/b.js")).await.unwrap();

    assert_eq!(repo.package_map("app").get("app/shared").unwrap().path, "app/b.js");
}

#[tokio::test]
async fn test_rebuild_ignores_files_outside_selected_packages() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], false);
    let builder = IncrementalBuilder::new(ctx.clone());

    builder.rebuild_file(&repo.src().join("lib/core.js")).await.unwrap();
    builder.rebuild_file(&repo.src().join("app/notes.txt")).await.unwrap();

    assert!(!repo.has_package_map("lib"));
    assert!(!repo.has_package_map("app"));
}

#[tokio::test]
async fn test_rebuild_all_resets_cache() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    let builder = IncrementalBuilder::new(ctx.clone());

    // Nothing built yet: the cache remembers an empty map
    assert!(ctx.cache().get("app").await.is_empty());

    builder.rebuild_all().await.unwrap();
    assert_eq!(ctx.cache().get("app").await.len(), 3);
    assert_eq!(ctx.cache().get("lib").await.len(), 2);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_map() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();
    let builder = IncrementalBuilder::new(ctx.clone());

    repo.add_file("app/util.js", "define([], function () {\n");
    assert!(builder.rebuild_file(&repo.src().join("app/util.js")).await.is_err());

    assert!(repo.package_map("app").get("app/util").unwrap().sync_deps.is_empty());
}
