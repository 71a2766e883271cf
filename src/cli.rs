//! CLI argument definitions using clap with subcommand architecture
//!
//! Flags override values read from `jet.toml`; see [`crate::config`].

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::build::hash::HashAlgorithm;
use crate::config::JetConfig;

/// Module bundler backend: builds AMD packages and serves combo bundles
#[derive(Parser, Debug)]
#[command(name = "jet")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build packages into artifacts and package maps
    #[command(visible_alias = "b")]
    Build(BuildArgs),

    /// Build, then serve combo bundles and rebuild on change
    #[command(visible_alias = "s")]
    Serve(ServeArgs),
}

// ============================================
// Shared source selection
// ============================================

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Packages to build (directories or top-level files of the source root)
    #[arg(value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Source root (default: current directory)
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Treat every directory and top-level source file as a package
    #[arg(short, long)]
    pub all: bool,

    /// Artifact output directory (default: <path>/../jetdist)
    #[arg(short, long, value_name = "DIR")]
    pub dist: Option<PathBuf>,

    /// Package map output directory (default: <dist>/../jetmap)
    #[arg(short, long, value_name = "DIR")]
    pub map: Option<PathBuf>,

    /// Prefix for every derived module id
    #[arg(long, value_name = "ID")]
    pub base_id: Option<String>,

    /// Number of build workers
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Keep artifacts at their source paths instead of content-addressed ones
    #[arg(long)]
    pub no_hash: bool,

    /// Hash function for content addressing
    #[arg(long, value_enum, value_name = "ALG")]
    pub hash_algorithm: Option<HashAlgorithm>,

    /// Keep output formatting (no minification)
    #[arg(short, long)]
    pub beautify: bool,

    /// Wrap files without a define call into one
    #[arg(long)]
    pub amd_wrapper: bool,

    /// Do not write source maps
    #[arg(long)]
    pub no_source_maps: bool,

    /// Remove the artifact and map directories first
    #[arg(short, long)]
    pub clean: bool,
}

impl SourceArgs {
    /// Source root as given on the command line
    pub fn src_dir(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn apply(&self, config: &mut JetConfig) {
        let build = &mut config.build;
        if !self.packages.is_empty() {
            build.packages = self.packages.clone();
        }
        if self.all {
            build.all = true;
        }
        if let Some(dist) = &self.dist {
            build.dist_dir = Some(dist.clone());
        }
        if let Some(map) = &self.map {
            build.map_dir = Some(map.clone());
        }
        if let Some(base_id) = &self.base_id {
            build.base_id = base_id.clone();
        }
        if let Some(workers) = self.workers {
            build.workers = Some(workers);
        }
        if self.no_hash {
            build.use_hash = false;
        }
        if let Some(algorithm) = self.hash_algorithm {
            build.hash_algorithm = algorithm;
        }
        if self.beautify {
            build.beautify = true;
        }
        if self.amd_wrapper {
            build.amd_wrapper = true;
        }
        if self.no_source_maps {
            build.source_maps = false;
        }
        if self.clean {
            build.clean = true;
        }
    }
}

// ============================================
// Build Subcommand
// ============================================

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl BuildArgs {
    pub fn apply(&self, config: &mut JetConfig) {
        self.source.apply(config);
    }
}

// ============================================
// Serve Subcommand
// ============================================

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Port to listen on
    #[arg(long, env = "JET_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "JET_HOST")]
    pub host: Option<String>,

    /// Origin consulted for packages and artifacts missing locally
    #[arg(short, long, env = "JET_REMOTE_HOST", value_name = "URL")]
    pub remote_host: Option<String>,

    /// Package map cache lifetime in milliseconds
    #[arg(long, value_name = "MS")]
    pub cache_ttl: Option<u64>,

    /// Quiet period before rebuilding after a change, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce: Option<u64>,

    /// Do not rebuild on source changes
    #[arg(long)]
    pub no_watch: bool,
}

impl ServeArgs {
    pub fn apply(&self, config: &mut JetConfig) {
        self.source.apply(config);
        let server = &mut config.server;
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(host) = &self.host {
            server.host = host.clone();
        }
        if let Some(remote) = &self.remote_host {
            server.remote_host = Some(remote.clone());
        }
        if let Some(debounce) = self.debounce {
            server.debounce_ms = debounce;
        }
        if self.no_watch {
            server.watch = false;
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache.ttl_ms = ttl;
        }
    }
}
