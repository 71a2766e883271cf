//! Rebuilds triggered by source changes
//!
//! A single changed file is recompiled on its own and its module entries are
//! spliced into the package map of its package. Anything else rebuilds the
//! whole tree. Compilation runs on the blocking pool so the server keeps
//! answering requests meanwhile.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::JetContext;
use crate::error::Result;
use crate::schema::PackageMap;
use crate::server::dispatcher::RebuildExecutor;

use super::build_all;
use super::walk::source_unit;

pub struct IncrementalBuilder {
    ctx: Arc<JetContext>,
}

impl IncrementalBuilder {
    pub fn new(ctx: Arc<JetContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl RebuildExecutor for IncrementalBuilder {
    async fn rebuild_file(&self, path: &Path) -> Result<()> {
        let ctx = &self.ctx;
        let options = ctx.pipeline().options();

        let Some(unit) = source_unit(&options.src_dir, path, &options.base_id, &options.extension)
        else {
            tracing::debug!("[BUILD] Ignoring {}", path.display());
            return Ok(());
        };
        if !options.packages.is_empty() && !options.packages.contains(&unit.package) {
            tracing::debug!("[BUILD] {} is outside the watched packages", unit.rel_path);
            return Ok(());
        }

        let pipeline = ctx.pipeline().clone();
        let result = tokio::task::spawn_blocking(move || pipeline.build_unit(&unit)).await??;

        let partial: PackageMap = result.definitions.into_iter().collect();
        let merged = ctx.cache().merge(&result.package, partial).await;
        ctx.store().save(&result.package, &merged)?;
        ctx.cache().invalidate(&result.package).await;

        tracing::info!(
            "[BUILD] Rebuilt {} ({} modules in {})",
            result.src_rel_path,
            merged.len(),
            result.package
        );
        Ok(())
    }

    async fn rebuild_all(&self) -> Result<()> {
        let pipeline = self.ctx.pipeline().clone();
        let store = self.ctx.store().clone();
        tokio::task::spawn_blocking(move || build_all(&pipeline, &store)).await??;
        self.ctx.cache().reset();
        Ok(())
    }
}
