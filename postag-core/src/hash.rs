//! SHA-256 checksums for model artifact integrity.

use sha2::{Digest, Sha256};

/// Raw 32-byte SHA-256 digest of in-memory data.
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hex-encoded SHA-256 of in-memory data.
pub fn sha256(data: &[u8]) -> String {
    hex::encode(sha256_digest(data))
}
