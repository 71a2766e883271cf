//! Grouping build results into package maps

use std::collections::HashMap;

use crate::error::{JetError, Result};
use crate::schema::{BuildResult, PackInfos};

/// Group per-file results by owning package.
///
/// A module id declared by two different files of the same package is an
/// error: parallel builds finish in arbitrary order, so there is no stable
/// winner. Every package that produced at least one file appears in the
/// output, even if none of its files declared a module.
pub fn group_results(results: &[BuildResult]) -> Result<PackInfos> {
    let mut ordered: Vec<&BuildResult> = results.iter().collect();
    ordered.sort_by(|a, b| a.src_rel_path.cmp(&b.src_rel_path));

    let mut infos = PackInfos::new();
    let mut origins: HashMap<(&str, &str), &str> = HashMap::new();

    for result in ordered {
        let pack = infos.entry(result.package.clone()).or_default();
        for (module_id, entry) in &result.definitions {
            if let Some(first) = origins.insert(
                (result.package.as_str(), module_id.as_str()),
                result.src_rel_path.as_str(),
            ) {
                return Err(JetError::DuplicateModule {
                    package: result.package.clone(),
                    module_id: module_id.clone(),
                    first: first.to_string(),
                    second: result.src_rel_path.clone(),
                });
            }
            pack.insert(module_id.clone(), entry.clone());
        }
    }

    Ok(infos)
}
