//! Source discovery and module id derivation
//!
//! A file at `src_root/<sub_path>` gets the base module id
//! `join(base_id, sub_path)` with its extension stripped, and belongs to the
//! package named by the first segment of that id:
//!
//! ```text
//! src/app/views/list.js  ->  id "app/views/list", package "app"
//! src/zepto.js           ->  id "zepto",          package "zepto"
//! ```

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::fs_utils::to_slash;
use crate::schema::package_of;

/// A source file eligible for compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Absolute (or root-joined) path on disk
    pub path: PathBuf,
    /// Path relative to the source root, `/`-separated, with extension
    pub rel_path: String,
    /// Module id derived from the path
    pub base_id: String,
    /// Owning package
    pub package: String,
}

/// Derive the base module id and package for a source-relative path.
///
/// Returns `None` if the file does not carry `extension`.
pub fn derive_ids(rel_path: &str, base_id: &str, extension: &str) -> Option<(String, String)> {
    let suffix = format!(".{}", extension);
    let stem = rel_path.strip_suffix(&suffix)?;

    let mut segments: Vec<&str> = Vec::new();
    for part in base_id.split('/').chain(stem.split('/')) {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }

    let id = segments.join("/");
    let package = package_of(&id).to_string();
    Some((id, package))
}

/// Build a [`SourceUnit`] for a file under `src_root`
pub fn source_unit(src_root: &Path, path: &Path, base_id: &str, extension: &str) -> Option<SourceUnit> {
    let rel = path.strip_prefix(src_root).ok()?;
    let rel_path = to_slash(rel);
    let (id, package) = derive_ids(&rel_path, base_id, extension)?;
    Some(SourceUnit {
        path: path.to_path_buf(),
        rel_path,
        base_id: id,
        package,
    })
}

/// Collect every eligible source file below `src_root` whose package is in
/// `packages` (all packages when `packages` is empty).
///
/// Hidden entries and anything under `exclude` (typically the artifact and
/// map directories) are skipped. The result is sorted by relative path.
pub fn collect_sources(
    src_root: &Path,
    packages: &[String],
    base_id: &str,
    extension: &str,
    exclude: &[PathBuf],
) -> Vec<SourceUnit> {
    let walker = WalkBuilder::new(src_root)
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .build();

    let mut units = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if exclude.iter().any(|ex| path.starts_with(ex)) {
            continue;
        }
        let Some(unit) = source_unit(src_root, path, base_id, extension) else {
            continue;
        };
        if !packages.is_empty() && !packages.contains(&unit.package) {
            tracing::debug!("[BUILD] Excluding {} (package {})", unit.rel_path, unit.package);
            continue;
        }
        units.push(unit);
    }

    units.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    units
}

/// Packages found directly under `src_root`: every directory and every
/// top-level source file, minus `ignored` names.
pub fn discover_packages(src_root: &Path, extension: &str, ignored: &[&str]) -> std::io::Result<Vec<String>> {
    let suffix = format!(".{}", extension);
    let mut packages = Vec::new();

    for entry in std::fs::read_dir(src_root)?.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || ignored.contains(&name.as_str()) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            packages.push(name);
        } else if let Some(stem) = name.strip_suffix(&suffix) {
            packages.push(stem.to_string());
        }
    }

    packages.sort();
    packages.dedup();
    Ok(packages)
}
