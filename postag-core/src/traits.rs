//! Core trait definitions for the postag workspace.
//!
//! These traits define the contracts collaborators implement across crates.

/// A source of fixed-dimension token embeddings.
///
/// The tagger treats the embedding as a black box: every call maps one token
/// to a real vector of length [`dim`](Embedder::dim). Nothing about a token is
/// cached between calls.
pub trait Embedder {
    /// Length of every vector returned by [`embed`](Embedder::embed).
    fn dim(&self) -> usize;

    /// The embedding vector for `token`.
    fn embed(&self, token: &str) -> Vec<f64>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, token: &str) -> Vec<f64> {
        (**self).embed(token)
    }
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
