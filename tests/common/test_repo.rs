//! TestRepo builder for end-to-end build and serve tests
//!
//! Layout inside one temporary directory:
//!
//! ```text
//! <tmp>/src   sources, one package per top-level entry
//! <tmp>/dist  artifacts
//! <tmp>/map   package maps
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jet_engine::{JetConfig, JetContext, PackageMap};
use tempfile::TempDir;

pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create an empty repository with a `src` directory
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("src")).expect("Failed to create src dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn src(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    pub fn dist(&self) -> PathBuf {
        self.dir.path().join("dist")
    }

    pub fn map(&self) -> PathBuf {
        self.dir.path().join("map")
    }

    /// Add a source file relative to `src`
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.src().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    pub fn remove_file(&self, relative_path: &str) -> &Self {
        fs::remove_file(self.src().join(relative_path)).expect("Failed to remove file");
        self
    }

    /// Configuration building `packages` into this repository's output roots
    pub fn config(&self, packages: &[&str], use_hash: bool) -> JetConfig {
        let mut config = JetConfig::for_source(&self.src()).expect("Failed to load config");
        config.build.packages = packages.iter().map(|p| p.to_string()).collect();
        config.build.dist_dir = Some(self.dist());
        config.build.map_dir = Some(self.map());
        config.build.use_hash = use_hash;
        config.build.workers = Some(2);
        config.resolve_packages().expect("Failed to resolve packages");
        config
    }

    pub fn context(&self, packages: &[&str], use_hash: bool) -> Arc<JetContext> {
        Arc::new(JetContext::new(self.config(packages, use_hash)))
    }

    /// Read an artifact relative to `dist`
    pub fn artifact(&self, relative_path: &str) -> String {
        fs::read_to_string(self.dist().join(relative_path)).expect("Failed to read artifact")
    }

    /// Read the persisted map of `package`
    pub fn package_map(&self, package: &str) -> PackageMap {
        let path = self.map().join(format!("{}.conf.json", package));
        let content = fs::read_to_string(&path).expect("Failed to read package map");
        let mut wrapped: BTreeMap<String, PackageMap> =
            serde_json::from_str(&content).expect("Malformed package map");
        wrapped.remove(package).expect("Package key missing from map file")
    }

    pub fn has_package_map(&self, package: &str) -> bool {
        self.map().join(format!("{}.conf.json", package)).exists()
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Two packages: `app` depends on `lib`, and `lib` has an internal cycle
pub fn sample_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.add_file(
        "app/main.js",
        "define(['app/util', 'lib/core'], function (util, core) {\n  require(['app/lazy']);\n});\n",
    )
    .add_file("app/util.js", "define([], function () { return 1; });\n")
    .add_file("app/lazy.js", "define(function () { return 'lazy'; });\n")
    .add_file("lib/core.js", "define(['lib/helper'], function () {});\n")
    .add_file("lib/helper.js", "define(['lib/core'], function () {});\n");
    repo
}
