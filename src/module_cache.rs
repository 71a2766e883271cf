//! In-memory package maps with time-bounded freshness
//!
//! [`ModuleCache::get`] never reports a package as absent. A miss walks
//! through three sources in order:
//!
//! 1. the [`MapStore`]
//! 2. the [`MissingPackageHandler`], which may populate the store out of band
//!    (the remote fallback does exactly that), followed by a second store read
//! 3. an empty map
//!
//! Whatever comes out is cached for the full TTL, including the empty map,
//! so a package that does not exist anywhere costs one lookup per TTL
//! window. Concurrent misses for the same package share a single load.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::schema::PackageMap;
use crate::store::{is_valid_package_name, MapStore};

/// Called when a package is neither cached nor persisted locally
#[async_trait]
pub trait MissingPackageHandler: Send + Sync {
    /// Try to make `package` available in the store. Failures are the
    /// handler's to log; the cache re-reads the store either way.
    async fn on_missing(&self, package: &str);
}

/// Handler for setups without any fallback
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

#[async_trait]
impl MissingPackageHandler for NoopHandler {
    async fn on_missing(&self, _package: &str) {}
}

/// TTL-bounded cache of package maps in front of a [`MapStore`]
#[derive(Clone)]
pub struct ModuleCache {
    entries: Cache<String, Arc<PackageMap>>,
    store: Arc<MapStore>,
    on_missing: Arc<dyn MissingPackageHandler>,
}

impl ModuleCache {
    pub fn new(
        store: Arc<MapStore>,
        on_missing: Arc<dyn MissingPackageHandler>,
        ttl: Duration,
        capacity: u64,
    ) -> Self {
        let entries = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            entries,
            store,
            on_missing,
        }
    }

    pub fn store(&self) -> &MapStore {
        &self.store
    }

    /// Map of `package`, loading it on a miss
    pub async fn get(&self, package: &str) -> Arc<PackageMap> {
        let store = self.store.clone();
        let on_missing = self.on_missing.clone();
        let name = package.to_string();

        self.entries
            .get_with(package.to_string(), async move {
                Arc::new(load_package(&store, on_missing.as_ref(), &name).await)
            })
            .await
    }

    /// Drop `package` so the next [`get`](Self::get) reloads it
    pub async fn invalidate(&self, package: &str) {
        self.entries.invalidate(package).await;
        tracing::debug!("[CACHE] Invalidated {}", package);
    }

    /// Splice `partial` into the live map of `package` and return the result
    pub async fn merge(&self, package: &str, partial: PackageMap) -> Arc<PackageMap> {
        let current = self.get(package).await;
        let mut merged = (*current).clone();
        merged.merge(partial);
        let merged = Arc::new(merged);
        self.entries
            .insert(package.to_string(), merged.clone())
            .await;
        merged
    }

    /// Drop every entry
    pub fn reset(&self) {
        self.entries.invalidate_all();
        tracing::debug!("[CACHE] Reset");
    }
}

async fn load_package(
    store: &MapStore,
    on_missing: &dyn MissingPackageHandler,
    package: &str,
) -> PackageMap {
    if !is_valid_package_name(package) {
        tracing::warn!("[CACHE] Invalid package name {:?}, caching empty map", package);
        return PackageMap::new();
    }
    if let Some(map) = store.load(package) {
        tracing::debug!("[CACHE] Loaded {} from store", package);
        return map;
    }

    tracing::debug!("[CACHE] {} not in store, asking fallback", package);
    on_missing.on_missing(package).await;

    match store.load(package) {
        Some(map) => map,
        None => {
            tracing::info!("[CACHE] Package {} not found, caching empty map", package);
            PackageMap::new()
        }
    }
}
