//! Parallel compilation of source files into artifacts
//!
//! Files are analyzed on a bounded rayon pool. Each worker reads its file,
//! runs the [`SourceAnalyzer`], and writes its own artifact and source map.
//! The first failure aborts the run: rayon stops handing out new files and
//! the error is returned to the caller. Files already in flight may still
//! finish writing.
//!
//! Completion order is not submission order, so results carry their source
//! path and callers group by it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::analyzer::{AnalyzeOptions, SourceAnalyzer};
use crate::error::{BuildFailure, JetError, Result};
use crate::fs_utils;
use crate::schema::{BuildResult, ModuleEntry};

use super::hash::{content_digest, hash_to_path, HashAlgorithm};
use super::walk::{collect_sources, SourceUnit};

/// Everything a pipeline run needs to know
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Source root
    pub src_dir: PathBuf,
    /// Artifact root
    pub dist_dir: PathBuf,
    /// Packages to include (empty = every package found)
    pub packages: Vec<String>,
    /// Prefix joined in front of every derived module id
    pub base_id: String,
    /// Module source extension, without the dot
    pub extension: String,
    /// Content addressing; `None` keeps artifacts at their source-derived path
    pub hash: Option<HashAlgorithm>,
    pub beautify: bool,
    pub amd_wrapper: bool,
    /// Write a `.map` sibling next to every artifact
    pub source_maps: bool,
    /// Worker pool size
    pub workers: usize,
    /// Directories never treated as sources
    pub exclude: Vec<PathBuf>,
}

impl BuildOptions {
    pub fn new(src_dir: impl Into<PathBuf>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            src_dir: src_dir.into(),
            dist_dir: dist_dir.into(),
            packages: Vec::new(),
            base_id: String::new(),
            extension: "js".to_string(),
            hash: Some(HashAlgorithm::Sha256),
            beautify: false,
            amd_wrapper: false,
            source_maps: true,
            workers: default_workers(),
            exclude: Vec::new(),
        }
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Compiles source files through a [`SourceAnalyzer`]
pub struct BuildPipeline {
    analyzer: Arc<dyn SourceAnalyzer>,
    options: BuildOptions,
}

impl BuildPipeline {
    pub fn new(analyzer: Arc<dyn SourceAnalyzer>, options: BuildOptions) -> Self {
        Self { analyzer, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Source files this pipeline would compile
    pub fn collect(&self) -> Vec<SourceUnit> {
        collect_sources(
            &self.options.src_dir,
            &self.options.packages,
            &self.options.base_id,
            &self.options.extension,
            &self.options.exclude,
        )
    }

    /// Compile the whole source tree
    pub fn run(&self) -> Result<Vec<BuildResult>> {
        let units = self.collect();
        tracing::info!(
            "[BUILD] Compiling {} files with {} workers",
            units.len(),
            self.options.workers
        );
        self.run_units(&units)
    }

    /// Compile `units` in parallel, failing fast on the first error
    pub fn run_units(&self, units: &[SourceUnit]) -> Result<Vec<BuildResult>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .thread_name(|i| format!("jet-build-{}", i))
            .build()
            .map_err(|e| JetError::Join {
                message: format!("failed to start build workers: {}", e),
            })?;

        pool.install(|| {
            units
                .par_iter()
                .map(|unit| self.build_unit(unit))
                .collect::<Result<Vec<_>>>()
        })
    }

    /// Compile one file and write its artifacts
    pub fn build_unit(&self, unit: &SourceUnit) -> Result<BuildResult> {
        let opts = &self.options;

        let source = std::fs::read_to_string(&unit.path).map_err(|e| {
            JetError::Analyze(
                BuildFailure::new(e.to_string())
                    .with_code(format!("{:?}", e.kind()))
                    .with_filename(unit.rel_path.clone()),
            )
        })?;

        let analyze_options = AnalyzeOptions {
            beautify: opts.beautify,
            amd_wrapper: opts.amd_wrapper,
            source_name: unit.rel_path.clone(),
        };
        let analyzer = &self.analyzer;
        let analysis = catch_unwind(AssertUnwindSafe(|| {
            analyzer.analyze(&source, &unit.base_id, &analyze_options)
        }))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(BuildFailure::new(format!("analyzer panicked: {}", message)).with_code("E_PANIC"))
        })
        .map_err(|failure| {
            let failure = if failure.filename.is_none() {
                failure.with_filename(unit.rel_path.clone())
            } else {
                failure
            };
            JetError::Analyze(failure)
        })?;

        let origin_path = format!("{}.{}", unit.base_id, opts.extension);
        let (artifact_path, content_hash) = match opts.hash {
            Some(algorithm) => {
                let digest = content_digest(algorithm, analysis.output.as_bytes());
                let path = format!("{}.{}", hash_to_path(&digest), opts.extension);
                (path, Some(digest))
            }
            None => (origin_path.clone(), None),
        };

        fs_utils::write_file(&opts.dist_dir.join(&artifact_path), &analysis.output)?;
        if content_hash.is_some() {
            // Stale references to the source-derived path keep resolving
            fs_utils::write_file(&opts.dist_dir.join(&origin_path), &analysis.output)?;
        }

        let source_map_path = if opts.source_maps {
            let map_path = format!("{}.map", artifact_path);
            fs_utils::write_file(&opts.dist_dir.join(&map_path), &analysis.source_map)?;
            Some(map_path)
        } else {
            None
        };

        if analysis.definitions.is_empty() {
            tracing::warn!("[BUILD] {} defines no modules", unit.rel_path);
        }

        let definitions = analysis
            .definitions
            .into_iter()
            .map(|(id, def)| {
                (
                    id,
                    ModuleEntry::new(artifact_path.clone(), def.sync_deps, def.async_deps),
                )
            })
            .collect();

        tracing::debug!("[BUILD] {} -> {}", unit.rel_path, artifact_path);

        Ok(BuildResult {
            src_rel_path: unit.rel_path.clone(),
            package: unit.package.clone(),
            artifact_path,
            source_map_path,
            content_hash,
            definitions,
        })
    }
}
