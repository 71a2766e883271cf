//! Durable package maps, one file per package
//!
//! `<map_dir>/<package>.conf.json` holds `{ "<package>": { "map": { ... } } }`.
//! Saves go through a temp file and a rename, so a server reading the map
//! concurrently never sees a partial write. Anything that cannot be read or
//! parsed is reported as absent.
//!
//! Package names arrive from requests and from the remote origin, so only
//! plain single-segment names map to a file.

use std::path::{Path, PathBuf};

use crate::error::{JetError, Result};
use crate::fs_utils::write_atomic;
use crate::schema::{PackInfos, PackageMap};

/// Suffix of persisted package map files
pub const MAP_FILE_SUFFIX: &str = ".conf.json";

/// Whether `package` is a plain name that stays inside the map directory
pub fn is_valid_package_name(package: &str) -> bool {
    !package.is_empty()
        && !package.starts_with('.')
        && !package.contains("..")
        && !package.contains(&['/', '\\', '\0'][..])
}

/// Reads and writes persisted package maps
#[derive(Debug, Clone)]
pub struct MapStore {
    dir: PathBuf,
}

impl MapStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `package`; `None` for names that are not
    /// a single plain segment
    pub fn path_for(&self, package: &str) -> Option<PathBuf> {
        is_valid_package_name(package)
            .then(|| self.dir.join(format!("{}{}", package, MAP_FILE_SUFFIX)))
    }

    pub fn exists(&self, package: &str) -> bool {
        self.path_for(package).is_some_and(|path| path.is_file())
    }

    /// Load the persisted map of `package`.
    ///
    /// Returns `None` when the file is missing, unreadable or malformed.
    pub fn load(&self, package: &str) -> Option<PackageMap> {
        let Some(path) = self.path_for(package) else {
            tracing::warn!("[STORE] Refusing to load invalid package name {:?}", package);
            return None;
        };
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("[STORE] Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        let mut infos: PackInfos = match serde_json::from_str(&content) {
            Ok(infos) => infos,
            Err(e) => {
                tracing::warn!("[STORE] Ignoring malformed map {}: {}", path.display(), e);
                return None;
            }
        };

        // Each package is read from its own file; other keys are not cached
        let map = infos.remove(package);
        if map.is_none() {
            tracing::warn!(
                "[STORE] {} does not describe package {}",
                path.display(),
                package
            );
        }
        map
    }

    /// Persist `map` as the full map of `package`, replacing any previous file
    pub fn save(&self, package: &str, map: &PackageMap) -> Result<()> {
        let path = self.path_for(package).ok_or_else(|| JetError::InvalidRequest {
            message: format!("invalid package name {:?}", package),
        })?;
        let mut infos = PackInfos::new();
        infos.insert(package.to_string(), map.clone());
        let json = serde_json::to_string_pretty(&infos)?;
        write_atomic(&path, json)?;
        tracing::debug!("[STORE] Saved {} ({} modules)", package, map.len());
        Ok(())
    }

    /// Persist every package in `infos`
    pub fn save_all(&self, infos: &PackInfos) -> Result<()> {
        for (package, map) in infos {
            self.save(package, map)?;
        }
        Ok(())
    }
}
