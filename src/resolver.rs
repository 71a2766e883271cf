//! Transitive dependency resolution over cached package maps
//!
//! Two granularities:
//!
//! - [`Resolver::resolve_module`] follows individual module ids, accumulating
//!   only the entries that are actually reachable
//! - [`Resolver::resolve_package`] pulls in whole packages: every package a
//!   dependency points into is accumulated with its complete map
//!
//! Lookups go through the [`ModuleCache`], so resolving may suspend on a
//! store read or a remote fetch. Each module-level walk keeps a visited set
//! of `(package, module id)` pairs, which makes dependency cycles (including
//! ones spanning several packages) terminate silently.

use std::collections::HashSet;

use futures_util::future::{BoxFuture, FutureExt};

use crate::module_cache::ModuleCache;
use crate::schema::{package_of, ModuleEntry, PackInfos};

type Visited = HashSet<(String, String)>;

/// Outcome of looking up one module id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundModule {
    /// Package the entry was found in, or the best guess when missing
    pub package: String,
    pub entry: Option<ModuleEntry>,
}

#[derive(Clone)]
pub struct Resolver {
    cache: ModuleCache,
}

impl Resolver {
    pub fn new(cache: ModuleCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Look `id` up in `hint` first, then in the package named by its first
    /// segment.
    pub async fn find_module(&self, id: &str, hint: Option<&str>) -> FoundModule {
        if let Some(hint) = hint {
            let map = self.cache.get(hint).await;
            if let Some(entry) = map.get(id) {
                return FoundModule {
                    package: hint.to_string(),
                    entry: Some(entry.clone()),
                };
            }
        }

        let id_package = package_of(id);
        let map = self.cache.get(id_package).await;
        if let Some(entry) = map.get(id) {
            return FoundModule {
                package: id_package.to_string(),
                entry: Some(entry.clone()),
            };
        }

        tracing::debug!("[CACHE] Module {} not found (hint {:?})", id, hint);
        FoundModule {
            package: hint.unwrap_or(id_package).to_string(),
            entry: None,
        }
    }

    /// Resolve `id` and everything it depends on into `acc`.
    ///
    /// Unresolvable ids are recorded as placeholder entries.
    pub async fn resolve_module(&self, id: &str, hint: Option<&str>, acc: &mut PackInfos) {
        let mut visited = Visited::new();
        self.visit_module(id.to_string(), hint.map(str::to_string), acc, &mut visited)
            .await;
    }

    /// Module-level closure of several ids, sharing one accumulator
    pub async fn resolve_modules(&self, ids: &[String]) -> PackInfos {
        let mut acc = PackInfos::new();
        let mut visited = Visited::new();
        for id in ids.iter().filter(|id| !id.is_empty()) {
            self.visit_module(id.clone(), None, &mut acc, &mut visited).await;
        }
        acc
    }

    fn visit_module<'a>(
        &'a self,
        id: String,
        hint: Option<String>,
        acc: &'a mut PackInfos,
        visited: &'a mut Visited,
    ) -> BoxFuture<'a, ()> {
        async move {
            let found = self.find_module(&id, hint.as_deref()).await;
            let package = found.package;

            if !visited.insert((package.clone(), id.clone())) {
                return;
            }
            acc.entry(package.clone()).or_default();

            let Some(entry) = found.entry else {
                if let Some(pack) = acc.get_mut(&package) {
                    pack.insert(id, ModuleEntry::placeholder());
                }
                return;
            };

            for dep in entry.all_deps() {
                let present = acc.get(&package).map(|p| p.contains(dep)).unwrap_or(false);
                if !present {
                    self.visit_module(dep.clone(), Some(package.clone()), acc, visited)
                        .await;
                }
            }

            if let Some(pack) = acc.get_mut(&package) {
                pack.insert(id, entry);
            }
        }
        .boxed()
    }

    /// Accumulate `package` and, transitively, every package its
    /// dependencies point into.
    pub async fn resolve_package(&self, package: &str, acc: &mut PackInfos) {
        self.visit_package(package.to_string(), acc).await;
    }

    /// Maps of `packages`, with their package-level closure when `follow_deps`
    pub async fn resolve_packages(&self, packages: &[String], follow_deps: bool) -> PackInfos {
        let mut acc = PackInfos::new();
        for package in packages.iter().filter(|p| !p.is_empty()) {
            if follow_deps {
                self.visit_package(package.clone(), &mut acc).await;
            } else {
                let map = self.cache.get(package).await;
                acc.insert(package.clone(), (*map).clone());
            }
        }
        acc
    }

    fn visit_package<'a>(&'a self, package: String, acc: &'a mut PackInfos) -> BoxFuture<'a, ()> {
        async move {
            let map = self.cache.get(&package).await;
            acc.insert(package, (*map).clone());

            for dep in map.map.values().flat_map(ModuleEntry::all_deps) {
                let dep_package = package_of(dep);
                if map.contains(dep) || acc.contains_key(dep_package) {
                    continue;
                }
                self.visit_package(dep_package.to_string(), acc).await;
            }
        }
        .boxed()
    }
}
