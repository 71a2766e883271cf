//! Command modules for the jet CLI
//!
//! - `build` - one-off build of the selected packages
//! - `serve` - initial build, then combo server plus incremental rebuilds
//!
//! Both resolve their configuration the same way: `jet.toml` in the source
//! root, overridden by command-line flags, with the package list settled
//! against the source tree.

pub mod build;
pub mod serve;

pub use build::run_build;
pub use serve::run_serve;

use crate::cli::SourceArgs;
use crate::config::JetConfig;
use crate::error::{JetError, Result};

/// Load `jet.toml` from the source root, apply flags and settle packages
pub fn load_config(source: &SourceArgs, apply: impl FnOnce(&mut JetConfig)) -> Result<JetConfig> {
    let src_dir = source.src_dir();
    let src_dir = std::fs::canonicalize(&src_dir).map_err(|e| {
        JetError::config(format!("Source directory {}: {}", src_dir.display(), e))
    })?;

    let mut config = JetConfig::for_source(&src_dir)?;
    apply(&mut config);
    // Output directories given on the command line are relative to the cwd
    config.anchor_output_dirs(&std::env::current_dir()?);
    config.resolve_packages()?;

    tracing::debug!("Source root: {}", config.src_dir().display());
    tracing::debug!("Packages: {:?}", config.build.packages);
    Ok(config)
}
