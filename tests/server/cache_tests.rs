//! Package map cache freshness against the map store

use std::time::Duration;

use jet_engine::{build_all, JetContext, ModuleEntry};

use crate::common::sample_repo;

#[tokio::test]
async fn test_cached_map_expires_after_ttl() {
    let repo = sample_repo();
    let mut config = repo.config(&["app"], false);
    config.cache.ttl_ms = 200;
    let ctx = JetContext::new(config);
    build_all(ctx.pipeline(), ctx.store()).unwrap();

    assert_eq!(ctx.cache().get("app").await.len(), 3);

    // Written behind the cache's back
    let mut map = repo.package_map("app");
    map.insert("app/extra", ModuleEntry::new("app/extra.js", vec![], vec![]));
    ctx.store().save("app", &map).unwrap();

    assert_eq!(ctx.cache().get("app").await.len(), 3);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(ctx.cache().get("app").await.len(), 4);
}

#[tokio::test]
async fn test_invalidate_forces_reload() {
    let repo = sample_repo();
    let ctx = repo.context(&["app"], false);
    build_all(ctx.pipeline(), ctx.store()).unwrap();
    assert_eq!(ctx.cache().get("app").await.len(), 3);

    let mut map = repo.package_map("app");
    map.insert("app/extra", ModuleEntry::new("app/extra.js", vec![], vec![]));
    ctx.store().save("app", &map).unwrap();
    ctx.cache().invalidate("app").await;

    assert!(ctx.cache().get("app").await.contains("app/extra"));
}
