//! Package map data model
//!
//! A package map records, for every module id declared inside one package,
//! where its built artifact lives and which ids it depends on. The on-disk
//! and on-wire shape uses single-letter keys:
//!
//! ```json
//! { "app": { "map": { "app/main": { "p": "app/main.js", "d": ["lib/a"], "a": [] } } } }
//! ```
//!
//! Maps are `BTreeMap`s so that serialization is always in sorted key order,
//! which keeps persisted files diff-friendly across rebuilds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One declared module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Artifact path relative to the artifact root (empty for placeholders)
    #[serde(rename = "p", default)]
    pub path: String,

    /// Dependencies required before evaluation
    #[serde(rename = "d", default)]
    pub sync_deps: Vec<String>,

    /// Dependencies loaded on demand
    #[serde(rename = "a", default)]
    pub async_deps: Vec<String>,
}

impl ModuleEntry {
    pub fn new(path: impl Into<String>, sync_deps: Vec<String>, async_deps: Vec<String>) -> Self {
        Self {
            path: path.into(),
            sync_deps,
            async_deps,
        }
    }

    /// Entry recorded for ids that could not be resolved anywhere
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn is_placeholder(&self) -> bool {
        self.path.is_empty() && self.sync_deps.is_empty() && self.async_deps.is_empty()
    }

    /// Sync deps first, then async deps, in declaration order
    pub fn all_deps(&self) -> impl Iterator<Item = &String> {
        self.sync_deps.iter().chain(self.async_deps.iter())
    }
}

/// All modules declared by one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMap {
    #[serde(default)]
    pub map: BTreeMap<String, ModuleEntry>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, module_id: &str) -> Option<&ModuleEntry> {
        self.map.get(module_id)
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.map.contains_key(module_id)
    }

    pub fn insert(&mut self, module_id: impl Into<String>, entry: ModuleEntry) {
        self.map.insert(module_id.into(), entry);
    }

    /// Splice entries in, replacing existing ids wholesale
    pub fn merge(&mut self, other: PackageMap) {
        self.map.extend(other.map);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, ModuleEntry)> for PackageMap {
    fn from_iter<I: IntoIterator<Item = (String, ModuleEntry)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

/// Package name -> package map; the shape of persisted files, remote
/// responses and resolver accumulators
pub type PackInfos = BTreeMap<String, PackageMap>;

/// Output of compiling one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Source path relative to the source root, `/`-separated
    pub src_rel_path: String,
    /// Package the source file belongs to
    pub package: String,
    /// Artifact path relative to the artifact root
    pub artifact_path: String,
    /// Source map path relative to the artifact root
    pub source_map_path: Option<String>,
    /// base64 digest of the transformed output, when content addressing is on
    pub content_hash: Option<String>,
    /// Modules declared by the file, with `path` already pointing at the artifact
    pub definitions: BTreeMap<String, ModuleEntry>,
}

/// Package a module id belongs to: its first path segment
pub fn package_of(module_id: &str) -> &str {
    module_id.split('/').next().unwrap_or(module_id)
}
