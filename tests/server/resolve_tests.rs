//! Dependency resolution over built package maps

use jet_engine::build_all;

use crate::common::sample_repo;

#[tokio::test]
async fn test_module_closure_spans_packages_and_async_deps() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let infos = ctx.resolver().resolve_modules(&["app/main".to_string()]).await;

    let app: Vec<_> = infos["app"].map.keys().cloned().collect();
    assert_eq!(app, vec!["app/lazy", "app/main", "app/util"]);
    let lib: Vec<_> = infos["lib"].map.keys().cloned().collect();
    assert_eq!(lib, vec!["lib/core", "lib/helper"]);
}

#[tokio::test]
async fn test_module_closure_only_includes_reachable_entries() {
    let repo = sample_repo();
    repo.add_file("lib/unused.js", "define([], function () {});\n");
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let infos = ctx.resolver().resolve_modules(&["app/util".to_string()]).await;
    assert_eq!(infos.keys().collect::<Vec<_>>(), vec!["app"]);
    assert_eq!(infos["app"].len(), 1);

    let infos = ctx.resolver().resolve_modules(&["lib/core".to_string()]).await;
    assert!(!infos["lib"].contains("lib/unused"));
}

#[tokio::test]
async fn test_unknown_module_becomes_placeholder() {
    let repo = sample_repo();
    repo.add_file("app/broken.js", "define(['vendor/missing'], function () {});\n");
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let infos = ctx.resolver().resolve_modules(&["app/broken".to_string()]).await;

    // Looked up with the `app` hint first, so the miss is recorded there
    assert!(infos["app"].get("vendor/missing").unwrap().is_placeholder());
    assert!(!infos.contains_key("vendor"));
}

#[tokio::test]
async fn test_package_resolution_without_deps_is_isolated() {
    let repo = sample_repo();
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let infos = ctx.resolver().resolve_packages(&["app".to_string()], false).await;
    assert_eq!(infos.keys().collect::<Vec<_>>(), vec!["app"]);
    assert_eq!(infos["app"], repo.package_map("app"));
}

#[tokio::test]
async fn test_package_resolution_pulls_whole_dependency_packages() {
    let repo = sample_repo();
    repo.add_file("lib/unused.js", "define([], function () {});\n");
    let ctx = repo.context(&["app", "lib"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    let infos = ctx.resolver().resolve_packages(&["app".to_string()], true).await;
    assert_eq!(infos.keys().collect::<Vec<_>>(), vec!["app", "lib"]);
    assert!(infos["lib"].contains("lib/unused"));
}
