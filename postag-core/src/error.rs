//! Structured error types for the postag workspace.

use thiserror::Error;

/// Unified error type for all postag operations.
#[derive(Debug, Error)]
pub enum PostagError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed corpus or embedding file)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (mismatched sample lengths, empty corpus, bad arguments)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An observation vector does not have the model's trained dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Encoding or decoding of a model body failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Compression or decompression failure
    #[error("compression error: {0}")]
    Compression(String),

    /// A model artifact failed validation (magic, version, checksum)
    #[error("corrupt model artifact: {0}")]
    Corrupt(String),
}

impl PostagError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        PostagError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}

/// Convenience alias used throughout the postag workspace.
pub type Result<T> = std::result::Result<T, PostagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_at_keeps_kind_and_names_path() {
        let err = PostagError::io_at(
            std::path::Path::new("/tmp/missing.txt"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        match err {
            PostagError::Io(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
                assert!(inner.to_string().contains("/tmp/missing.txt"));
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn dimension_mismatch_message() {
        let err = PostagError::DimensionMismatch {
            expected: 50,
            found: 3,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 50, found 3");
    }
}
