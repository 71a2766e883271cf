//! Dev server command handler
//!
//! Builds every selected package once, then serves combo bundles while a
//! file watcher feeds source changes into the build dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::build::{clean_outputs, IncrementalBuilder};
use crate::cli::ServeArgs;
use crate::context::JetContext;
use crate::error::{JetError, Result};
use crate::server::{serve, BuildDispatcher, ComboService, FileWatcher, RebuildExecutor, WatcherConfig};

use super::load_config;

/// Run the dev server until Ctrl-C
pub fn run_serve(args: &ServeArgs) -> Result<String> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| JetError::config(format!("Failed to create tokio runtime: {}", e)))?;

    runtime.block_on(run_serve_async(args))?;
    Ok(String::new())
}

async fn run_serve_async(args: &ServeArgs) -> Result<()> {
    let config = load_config(&args.source, |config| args.apply(config))?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| JetError::config(format!("Invalid listen address: {}", e)))?;

    if config.build.clean {
        clean_outputs(&[&config.dist_dir(), &config.map_dir()])?;
    }

    let ctx = Arc::new(JetContext::new(config));
    match ctx.remote() {
        Some(remote) => tracing::info!("Remote origin: {}", remote.host()),
        None => tracing::info!("No remote origin configured"),
    }

    let builder = Arc::new(IncrementalBuilder::new(Arc::clone(&ctx)));
    builder.rebuild_all().await?;

    let _watcher_handle = if ctx.config().server.watch {
        let dispatcher = BuildDispatcher::new(builder, ctx.config().server.debounce())?;
        let options = ctx.pipeline().options();
        let watcher = FileWatcher::new(
            ctx.src_dir().to_path_buf(),
            WatcherConfig {
                packages: options.packages.clone(),
                base_id: options.base_id.clone(),
                extension: options.extension.clone(),
                exclude: options.exclude.clone(),
                ..Default::default()
            },
        );
        Some(watcher.start(dispatcher)?)
    } else {
        tracing::info!("[WATCHER] Disabled");
        None
    };

    serve(Arc::new(ComboService::new(ctx)), addr).await
}
