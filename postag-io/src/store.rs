//! Checksummed binary artifacts.
//!
//! Layout, all integers little-endian:
//!
//! | bytes | field                                  |
//! |-------|----------------------------------------|
//! | 8     | magic `POSTAGHM`                       |
//! | 4     | format version (`u32`)                 |
//! | 1     | [`Compression`] tag                    |
//! | 32    | SHA-256 of the uncompressed body       |
//! | rest  | bincode body, compressed per the tag   |

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use postag_core::hash::{sha256, sha256_digest};
use postag_core::{PostagError, Result};

use crate::compress::Compression;

pub const MAGIC: [u8; 8] = *b"POSTAGHM";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 1 + 32;

/// How artifacts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    pub compression: Compression,
    /// Compression level; `None` uses the algorithm's default.
    pub level: Option<i32>,
}

impl StoreConfig {
    fn level(&self) -> i32 {
        self.level
            .unwrap_or_else(|| self.compression.default_level())
    }
}

/// Serialize `value` into a framed artifact.
pub fn encode_artifact<T: Serialize>(value: &T, config: &StoreConfig) -> Result<Vec<u8>> {
    let body = bincode::serialize(value).map_err(|e| PostagError::Serialization(e.to_string()))?;
    let digest = sha256_digest(&body);
    let packed = config.compression.compress(&body, config.level())?;
    debug!(
        raw = body.len(),
        packed = packed.len(),
        compression = %config.compression,
        "encoded artifact body"
    );

    let mut out = Vec::with_capacity(HEADER_LEN + packed.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(config.compression.tag());
    out.extend_from_slice(&digest);
    out.extend_from_slice(&packed);
    Ok(out)
}

/// Validate and decode a framed artifact.
///
/// # Errors
///
/// Returns [`PostagError::Corrupt`] if the header is truncated, the magic or
/// version is wrong, the compression tag is unknown, the body does not
/// decompress, or its checksum does not match.
pub fn decode_artifact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(PostagError::Corrupt(format!(
            "artifact is {} bytes, shorter than its {HEADER_LEN}-byte header",
            bytes.len()
        )));
    }
    let (header, packed) = bytes.split_at(HEADER_LEN);
    if header[..8] != MAGIC {
        return Err(PostagError::Corrupt("bad magic, not a postag model".into()));
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&header[8..12]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(PostagError::Corrupt(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    let compression = Compression::from_tag(header[12])?;
    let expected = &header[13..HEADER_LEN];

    let body = compression
        .decompress(packed)
        .map_err(|e| PostagError::Corrupt(format!("body does not decompress: {e}")))?;
    if sha256_digest(&body)[..] != *expected {
        return Err(PostagError::Corrupt(format!(
            "checksum mismatch: body hashes to {}",
            sha256(&body)
        )));
    }
    bincode::deserialize(&body).map_err(|e| PostagError::Serialization(e.to_string()))
}

/// Write `value` to `path` as a framed artifact.
pub fn save_artifact<T: Serialize>(
    path: impl AsRef<Path>,
    value: &T,
    config: &StoreConfig,
) -> Result<()> {
    let path = path.as_ref();
    let bytes = encode_artifact(value, config)?;
    std::fs::write(path, &bytes).map_err(|e| PostagError::io_at(path, e))?;
    info!(path = %path.display(), bytes = bytes.len(), "saved artifact");
    Ok(())
}

/// Read and decode the framed artifact at `path`.
pub fn load_artifact<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| PostagError::io_at(path, e))?;
    let value = decode_artifact(&bytes).map_err(|e| match e {
        PostagError::Corrupt(msg) => PostagError::Corrupt(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "loaded artifact");
    Ok(value)
}
