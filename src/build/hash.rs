//! Content addressing for build artifacts
//!
//! An artifact's digest is `base64(hash(bytes))`. Its storage path is built
//! from the first 8 digest characters, lower-cased, with `/` and `+` mapped to
//! `_`, split into 2-character directory segments:
//!
//! ```text
//! digest "Ab12/c3dQ..."  ->  "ab/12/_c/3d"  ->  artifact "ab/12/_c/3d.js"
//! ```

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

/// Number of digest characters used to derive an artifact path
pub const PATH_PREFIX_LEN: usize = 8;

/// Hash function used for content addressing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

/// base64 digest of `bytes`
pub fn content_digest(algorithm: HashAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => general_purpose::STANDARD.encode(Sha256::digest(bytes)),
        HashAlgorithm::Sha512 => general_purpose::STANDARD.encode(Sha512::digest(bytes)),
    }
}

/// Sharded relative directory path derived from a digest (no extension)
pub fn hash_to_path(digest: &str) -> String {
    let prefix: Vec<char> = digest
        .chars()
        .take(PATH_PREFIX_LEN)
        .map(|c| match c {
            '/' | '+' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect();

    prefix
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}
