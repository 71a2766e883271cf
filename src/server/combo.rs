//! Combo bundles: many artifacts in one response
//!
//! Transport-independent; [`super::http`] maps these operations onto routes.
//!
//! - [`ComboService::bypath`]: concatenate artifacts by path
//! - [`ComboService::byid`]: resolve module ids to artifact paths, then as above
//! - [`ComboService::deps`]: resolved dependency maps as data
//!
//! Each bundled artifact is preceded by a `/*module: <path>*/` marker. An
//! artifact that cannot be read is replaced by a `console.warn` statement
//! naming it; only when every artifact is missing is the bundle absent.

use std::path::Path;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::context::JetContext;
use crate::error::{JetError, Result};
use crate::fs_utils::join_under;
use crate::schema::PackInfos;

/// Combo entries starting with this marker are dropped
pub const IGNORE_MARKER: char = '~';

/// Parse the combo list out of a raw query string.
///
/// The list is the name of the first query parameter, e.g. `a/x.js,b/y.js`
/// from `/bypath?a/x.js,b/y.js` (a doubled `??` is accepted as well).
/// Entries are trimmed and de-duplicated, keeping first-seen order.
pub fn parse_combo_query(raw_query: Option<&str>) -> Result<Vec<String>> {
    let first_key = raw_query
        .and_then(|q| url::form_urlencoded::parse(q.as_bytes()).next())
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default();
    let list = first_key.strip_prefix('?').unwrap_or(&first_key);

    if list.is_empty() {
        return Err(JetError::InvalidRequest {
            message: "expected a comma-separated list after '?'".to_string(),
        });
    }

    let mut entries: Vec<String> = Vec::new();
    for entry in list.split(',').map(str::trim) {
        if entry.is_empty() || entry.starts_with(IGNORE_MARKER) {
            continue;
        }
        if !entries.iter().any(|e| e == entry) {
            entries.push(entry.to_string());
        }
    }
    Ok(entries)
}

/// Query of the dependency introspection endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepsQuery {
    /// Comma-separated module ids
    pub ids: Option<String>,
    /// Comma-separated package names
    pub packs: Option<String>,
    /// For `packs`: `0` returns the packages alone, anything else their closure
    pub dep: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepsResponse {
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PackInfos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl DepsResponse {
    fn ok(data: PackInfos) -> Self {
        Self {
            status: 0,
            data: Some(data),
            info: None,
        }
    }

    fn invalid(info: impl Into<String>) -> Self {
        Self {
            status: 1,
            data: None,
            info: Some(info.into()),
        }
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct ComboService {
    ctx: Arc<JetContext>,
}

impl ComboService {
    pub fn new(ctx: Arc<JetContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &JetContext {
        &self.ctx
    }

    /// Bundle the artifacts at `paths`; `None` when none could be read
    pub async fn bypath(&self, paths: &[String]) -> Option<String> {
        if let Some(remote) = self.ctx.remote() {
            if let Err(e) = remote.fetch_missing_code(paths).await {
                tracing::warn!("[COMBO] Remote code fallback failed: {}", e);
            }
        }

        let dist = self.ctx.dist_dir();
        let contents = join_all(paths.iter().map(|p| read_artifact(dist, p))).await;

        let mut bundle = String::new();
        let mut any_read = false;
        for (path, content) in paths.iter().zip(contents) {
            bundle.push_str(&format!("\n/*module: {}*/", path));
            match content {
                Some(content) => {
                    any_read = true;
                    bundle.push_str(&content);
                }
                None => {
                    tracing::warn!("[COMBO] Missing artifact {}", path);
                    bundle.push_str(&format!(
                        "console.warn(\"[JetError] Fail to read the module file <{}> .\");",
                        path
                    ));
                }
            }
        }

        any_read.then_some(bundle)
    }

    /// Bundle the artifacts of module `ids`; unresolvable ids are skipped
    pub async fn byid(&self, ids: &[String]) -> Option<String> {
        let mut paths = Vec::new();
        for id in ids {
            let found = self.ctx.resolver().find_module(id, None).await;
            match found.entry {
                Some(entry) if !entry.path.is_empty() => paths.push(entry.path),
                _ => tracing::debug!("[COMBO] Skipping unresolved module {}", id),
            }
        }
        self.bypath(&paths).await
    }

    /// Resolved dependency maps for `ids` or `packs`
    pub async fn deps(&self, query: &DepsQuery) -> DepsResponse {
        let resolver = self.ctx.resolver();
        if let Some(ids) = query.ids.as_deref().filter(|s| !s.is_empty()) {
            return DepsResponse::ok(resolver.resolve_modules(&split_list(ids)).await);
        }
        if let Some(packs) = query.packs.as_deref().filter(|s| !s.is_empty()) {
            let follow = query.dep.as_deref() != Some("0");
            return DepsResponse::ok(resolver.resolve_packages(&split_list(packs), follow).await);
        }
        DepsResponse::invalid("missing ids or packs parameter")
    }
}

async fn read_artifact(root: &Path, rel: &str) -> Option<String> {
    let path = join_under(root, rel)?;
    tokio::fs::read_to_string(&path).await.ok()
}
