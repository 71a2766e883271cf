//! Shared handle over everything a running jet instance needs
//!
//! Built once at startup and passed around behind an `Arc`. Nothing in the
//! crate keeps process-wide state, so several independent instances (for
//! example one per test) can live side by side.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzer::{DefineAnalyzer, SourceAnalyzer};
use crate::build::BuildPipeline;
use crate::config::JetConfig;
use crate::module_cache::{MissingPackageHandler, ModuleCache, NoopHandler};
use crate::remote::RemoteLoader;
use crate::resolver::Resolver;
use crate::store::MapStore;

pub struct JetContext {
    config: JetConfig,
    dist_dir: PathBuf,
    store: Arc<MapStore>,
    cache: ModuleCache,
    resolver: Resolver,
    pipeline: Arc<BuildPipeline>,
    remote: Option<Arc<RemoteLoader>>,
}

impl JetContext {
    /// Context with the default analyzer, and the remote fallback when a
    /// remote host is configured
    pub fn new(config: JetConfig) -> Self {
        Self::with_analyzer(config, Arc::new(DefineAnalyzer::new()))
    }

    pub fn with_analyzer(config: JetConfig, analyzer: Arc<dyn SourceAnalyzer>) -> Self {
        let store = Arc::new(MapStore::new(config.map_dir()));
        let remote = config
            .server
            .remote_host
            .as_ref()
            .filter(|host| !host.is_empty())
            .map(|host| Arc::new(RemoteLoader::new(host.clone(), store.clone(), config.dist_dir())));
        let on_missing: Arc<dyn MissingPackageHandler> = match &remote {
            Some(remote) => remote.clone(),
            None => Arc::new(NoopHandler),
        };
        Self::assemble(config, analyzer, store, on_missing, remote)
    }

    /// Context with an explicit missing-package strategy and no remote
    pub fn with_handler(
        config: JetConfig,
        analyzer: Arc<dyn SourceAnalyzer>,
        on_missing: Arc<dyn MissingPackageHandler>,
    ) -> Self {
        let store = Arc::new(MapStore::new(config.map_dir()));
        Self::assemble(config, analyzer, store, on_missing, None)
    }

    fn assemble(
        config: JetConfig,
        analyzer: Arc<dyn SourceAnalyzer>,
        store: Arc<MapStore>,
        on_missing: Arc<dyn MissingPackageHandler>,
        remote: Option<Arc<RemoteLoader>>,
    ) -> Self {
        let cache = ModuleCache::new(
            store.clone(),
            on_missing,
            config.cache.ttl(),
            config.cache.capacity,
        );
        let resolver = Resolver::new(cache.clone());
        let pipeline = Arc::new(BuildPipeline::new(analyzer, config.build_options()));

        Self {
            dist_dir: config.dist_dir(),
            config,
            store,
            cache,
            resolver,
            pipeline,
            remote,
        }
    }

    pub fn config(&self) -> &JetConfig {
        &self.config
    }

    pub fn src_dir(&self) -> &Path {
        self.config.src_dir()
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    pub fn store(&self) -> &Arc<MapStore> {
        &self.store
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn pipeline(&self) -> &Arc<BuildPipeline> {
        &self.pipeline
    }

    pub fn remote(&self) -> Option<&RemoteLoader> {
        self.remote.as_deref()
    }
}
