//! Shared primitives, traits, and utilities for the postag part-of-speech tagger.
//!
//! `postag-core` provides the foundation the other postag crates build on:
//!
//! - **Error types**: [`PostagError`] and [`Result`] for structured error handling
//! - **Log-space probabilities**: [`LogProb`] with `-∞` as a first-class "impossible"
//! - **Traits**: the [`Embedder`] contract for token embedding providers
//! - **Hashing**: SHA-256 checksums for model artifact integrity

pub mod error;
pub mod hash;
pub mod prob;
pub mod traits;

pub use error::{PostagError, Result};
pub use prob::LogProb;
pub use traits::*;
