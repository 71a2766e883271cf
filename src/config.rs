//! jet configuration
//!
//! Values come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional `jet.toml` in the source root
//! 3. command-line flags (and their environment variables)
//!
//! ```toml
//! [build]
//! packages = ["app", "lib"]
//! use_hash = true
//!
//! [cache]
//! ttl_ms = 10000
//!
//! [server]
//! port = 8111
//! remote_host = "http://jet.example.com:8060"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::build::hash::HashAlgorithm;
use crate::build::pipeline::{default_workers, BuildOptions};
use crate::build::walk::discover_packages;
use crate::error::{JetError, Result};
use crate::fs_utils::absolutize;

/// File name looked up in the source root
pub const CONFIG_FILE: &str = "jet.toml";

/// Directory names that are never packages
pub const RESERVED_DIRS: [&str; 2] = ["jetdist", "jetmap"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JetConfig {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Build settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Source root
    pub src_dir: PathBuf,
    /// Artifact root (default `<src>/../jetdist`)
    pub dist_dir: Option<PathBuf>,
    /// Package map directory (default `<dist>/../jetmap`)
    pub map_dir: Option<PathBuf>,
    /// Packages to build
    pub packages: Vec<String>,
    /// Treat every directory and top-level source file as a package
    pub all: bool,
    /// Content-address artifacts
    pub use_hash: bool,
    pub hash_algorithm: HashAlgorithm,
    pub beautify: bool,
    pub amd_wrapper: bool,
    pub source_maps: bool,
    /// Remove the artifact and map directories before building
    pub clean: bool,
    pub base_id: String,
    pub extension: String,
    /// Worker pool size (default: available parallelism)
    pub workers: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("."),
            dist_dir: None,
            map_dir: None,
            packages: Vec::new(),
            all: false,
            use_hash: true,
            hash_algorithm: HashAlgorithm::default(),
            beautify: false,
            amd_wrapper: false,
            source_maps: true,
            clean: false,
            base_id: String::new(),
            extension: "js".to_string(),
            workers: None,
        }
    }
}

/// Module cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached package map, in milliseconds
    pub ttl_ms: u64,
    /// Maximum number of cached packages
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 10_000,
            capacity: 500,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Dev server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Quiet period before a batch of file changes is rebuilt, in milliseconds
    pub debounce_ms: u64,
    /// Origin consulted for packages and artifacts missing locally
    pub remote_host: Option<String>,
    /// Rebuild on source changes
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8111,
            debounce_ms: 300,
            remote_host: None,
            watch: true,
        }
    }
}

impl ServerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl JetConfig {
    /// Configuration for `src_dir`, reading `<src_dir>/jet.toml` when present.
    ///
    /// Relative output directories in the file are taken relative to `src_dir`.
    pub fn for_source(src_dir: &Path) -> Result<Self> {
        let mut config = Self::load_from(&src_dir.join(CONFIG_FILE))?;
        config.build.src_dir = src_dir.to_path_buf();
        config.anchor_output_dirs(src_dir);
        Ok(config)
    }

    /// Make configured artifact and map directories absolute against `base`
    pub fn anchor_output_dirs(&mut self, base: &Path) {
        let build = &mut self.build;
        for dir in [&mut build.dist_dir, &mut build.map_dir].into_iter().flatten() {
            *dir = absolutize(dir.as_path(), base);
        }
    }

    /// Load a configuration file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            JetError::config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    pub fn src_dir(&self) -> &Path {
        &self.build.src_dir
    }

    pub fn dist_dir(&self) -> PathBuf {
        let dir = match &self.build.dist_dir {
            Some(dir) => dir.clone(),
            None => self.build.src_dir.join("..").join("jetdist"),
        };
        absolutize(&dir, &self.build.src_dir)
    }

    pub fn map_dir(&self) -> PathBuf {
        let dir = match &self.build.map_dir {
            Some(dir) => dir.clone(),
            None => self.dist_dir().join("..").join("jetmap"),
        };
        absolutize(&dir, &self.build.src_dir)
    }

    pub fn workers(&self) -> usize {
        self.build.workers.unwrap_or_else(default_workers).max(1)
    }

    /// Settle the package list: discover every package with `all`, otherwise
    /// check that each named package exists as a directory or source file.
    pub fn resolve_packages(&mut self) -> Result<()> {
        let build = &self.build;
        let mut packages = if build.all {
            // Output directories inside the source root are never packages
            let outputs = [self.dist_dir(), self.map_dir()];
            discover_packages(&build.src_dir, &build.extension, &RESERVED_DIRS)?
                .into_iter()
                .filter(|name| !outputs.contains(&absolutize(Path::new(name), &build.src_dir)))
                .collect()
        } else {
            let mut named = Vec::new();
            for name in &build.packages {
                let name = name.trim_end_matches('/');
                let dir = build.src_dir.join(name);
                let file = build.src_dir.join(format!("{}.{}", name, build.extension));
                if !dir.is_dir() && !file.is_file() {
                    return Err(JetError::config(format!("Package not found: {}", name)));
                }
                let package = Path::new(name)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| name.to_string());
                named.push(package);
            }
            named
        };

        packages.sort();
        packages.dedup();
        if packages.is_empty() {
            return Err(JetError::config("No packages to build (name some or pass --all)"));
        }
        self.build.packages = packages;
        Ok(())
    }

    /// Pipeline options for the configured packages
    pub fn build_options(&self) -> BuildOptions {
        let build = &self.build;
        BuildOptions {
            src_dir: build.src_dir.clone(),
            dist_dir: self.dist_dir(),
            packages: build.packages.clone(),
            base_id: build.base_id.clone(),
            extension: build.extension.clone(),
            hash: build.use_hash.then_some(build.hash_algorithm),
            beautify: build.beautify,
            amd_wrapper: build.amd_wrapper,
            source_maps: build.source_maps,
            workers: self.workers(),
            exclude: vec![self.dist_dir(), self.map_dir()],
        }
    }
}
