//! Building source trees into artifacts and package maps
//!
//! - [`walk`]: which files are sources and what module ids they get
//! - [`pipeline`]: parallel compilation into (optionally content-addressed) artifacts
//! - [`packages`]: grouping per-file results into package maps
//! - [`incremental`]: single-file and full rebuilds for the dev server

pub mod hash;
pub mod incremental;
pub mod packages;
pub mod pipeline;
pub mod walk;

use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::schema::PackInfos;
use crate::store::MapStore;

pub use hash::HashAlgorithm;
pub use incremental::IncrementalBuilder;
pub use packages::group_results;
pub use pipeline::{BuildOptions, BuildPipeline};
pub use walk::{collect_sources, discover_packages, SourceUnit};

/// Summary of a full build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub files: usize,
    pub packages: usize,
    pub modules: usize,
    pub elapsed: Duration,
}

/// Compile every source file and persist the resulting package maps.
///
/// Nothing is persisted if any file fails or a module id is declared twice
/// within one package.
pub fn build_all(pipeline: &BuildPipeline, store: &MapStore) -> Result<(PackInfos, BuildReport)> {
    let start = Instant::now();

    let results = pipeline.run()?;
    let infos = group_results(&results)?;
    store.save_all(&infos)?;

    let report = BuildReport {
        files: results.len(),
        packages: infos.len(),
        modules: infos.values().map(|p| p.len()).sum(),
        elapsed: start.elapsed(),
    };
    tracing::info!(
        "[BUILD] Built {} files into {} packages ({} modules) in {:?}",
        report.files,
        report.packages,
        report.modules,
        report.elapsed
    );
    Ok((infos, report))
}

/// Remove output directories left by a previous build
pub fn clean_outputs(dirs: &[&Path]) -> Result<()> {
    for dir in dirs {
        if dir.exists() {
            tracing::info!("[BUILD] Removing {}", dir.display());
            std::fs::remove_dir_all(dir)?;
        }
    }
    Ok(())
}
