//! Remote fallback for packages and artifacts missing locally
//!
//! Two endpoints on the configured origin:
//!
//! - `GET /packinfo?packs=a,b&dep=1&code=1` returns package maps plus the
//!   code of their artifacts; maps land in the [`MapStore`], code under the
//!   artifact root
//! - `GET /code?path=x,y` returns the code of individual artifacts
//!
//! Both answer `{ "status": 0, "data": ... }`. A non-zero status, a failed
//! request, or a `null`/`false` code entry only produces a warning; the
//! caller carries on as if the item were still missing.
//!
//! Static files missing from the source root are relayed as-is through
//! [`RemoteLoader::fetch_static`], whatever status the origin answers with.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{JetError, Result};
use crate::fs_utils::{join_under, write_file};
use crate::module_cache::MissingPackageHandler;
use crate::schema::PackInfos;
use crate::store::{is_valid_package_name, MapStore};

#[derive(Debug, Deserialize)]
struct RemoteResponse<T> {
    #[serde(default)]
    status: i64,
    data: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackInfoData {
    #[serde(default)]
    pack_infos: PackInfos,
    #[serde(default)]
    codes: BTreeMap<String, serde_json::Value>,
}

/// A file relayed from the origin's `/static` tree
#[derive(Debug, Clone)]
pub struct RemoteFile {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Client for the remote origin
pub struct RemoteLoader {
    client: reqwest::Client,
    host: String,
    store: Arc<MapStore>,
    dist_dir: PathBuf,
}

impl RemoteLoader {
    pub fn new(host: impl Into<String>, store: Arc<MapStore>, dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            host: host.into().trim_end_matches('/').to_string(),
            store,
            dist_dir: dist_dir.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Fetch `packages` (and their dependencies) into the store.
    ///
    /// Returns the number of package maps written.
    pub async fn fetch_packages(&self, packages: &[String]) -> Result<usize> {
        if packages.is_empty() {
            return Ok(0);
        }
        let packs = packages.join(",");
        tracing::warn!("[REMOTE] Requesting {}/packinfo?packs={}", self.host, packs);

        let response: RemoteResponse<PackInfoData> = self
            .get_json(
                "packinfo",
                &[("packs", packs.as_str()), ("dep", "1"), ("code", "1")],
            )
            .await?;
        let Some(data) = accepted(response, "packinfo") else {
            return Ok(0);
        };

        let mut written = 0;
        for (package, map) in &data.pack_infos {
            if !is_valid_package_name(package) {
                tracing::warn!("[REMOTE] Skipping invalid package name {:?}", package);
                continue;
            }
            self.store.save(package, map)?;
            tracing::info!("[REMOTE] Fetched package {}", package);
            written += 1;
        }
        self.write_codes(data.codes)?;
        Ok(written)
    }

    /// Fetch the artifacts in `paths` that are not present locally.
    ///
    /// Returns the number of artifacts written.
    pub async fn fetch_missing_code(&self, paths: &[String]) -> Result<usize> {
        let missing: Vec<&str> = paths
            .iter()
            .filter(|p| {
                join_under(&self.dist_dir, p)
                    .map(|full| !full.exists())
                    .unwrap_or(false)
            })
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let joined = missing.join(",");
        tracing::warn!("[REMOTE] Requesting {}/code?path={}", self.host, joined);

        let response: RemoteResponse<BTreeMap<String, serde_json::Value>> =
            self.get_json("code", &[("path", joined.as_str())]).await?;
        match accepted(response, "code") {
            Some(codes) => self.write_codes(codes),
            None => Ok(0),
        }
    }

    /// Relay `GET <host><path_and_query>`; any HTTP status is passed back
    /// to the caller, only transport failures are errors
    pub async fn fetch_static(&self, path_and_query: &str) -> Result<RemoteFile> {
        let url = format!("{}{}", self.host, path_and_query);
        let response = self.client.get(&url).send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();
        tracing::debug!("[REMOTE] {} -> {} ({} bytes)", url, status, body.len());

        Ok(RemoteFile {
            status,
            content_type,
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.host, endpoint);
        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(JetError::Remote {
                message: format!("{} returned {}", url, response.status()),
            });
        }

        Ok(response.json().await?)
    }

    fn write_codes(&self, codes: BTreeMap<String, serde_json::Value>) -> Result<usize> {
        let mut written = 0;
        for (path, code) in codes {
            let serde_json::Value::String(code) = code else {
                tracing::warn!("[REMOTE] No remote code for {}", path);
                continue;
            };
            let Some(target) = join_under(&self.dist_dir, &path) else {
                tracing::warn!("[REMOTE] Refusing to write outside the artifact root: {}", path);
                continue;
            };
            write_file(&target, code)?;
            written += 1;
        }
        Ok(written)
    }
}

/// Payload of a successful response, logging anything else
fn accepted<T>(response: RemoteResponse<T>, endpoint: &str) -> Option<T> {
    if response.status != 0 {
        tracing::warn!("[REMOTE] /{} answered with status {}", endpoint, response.status);
        return None;
    }
    if response.data.is_none() {
        tracing::warn!("[REMOTE] /{} answered without data", endpoint);
    }
    response.data
}

#[async_trait]
impl MissingPackageHandler for RemoteLoader {
    async fn on_missing(&self, package: &str) {
        if let Err(e) = self.fetch_packages(&[package.to_string()]).await {
            tracing::warn!("[REMOTE] Fetching package {} failed: {}", package, e);
        }
    }
}
