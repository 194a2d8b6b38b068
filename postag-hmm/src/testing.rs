//! Shared fixtures for unit tests.

use std::collections::HashMap;

use postag_core::Embedder;

use crate::train::Sample;

/// A fixed lookup-table embedder; unknown tokens map to the zero vector.
pub(crate) struct TableEmbedder {
    dim: usize,
    table: HashMap<String, Vec<f64>>,
}

impl TableEmbedder {
    pub(crate) fn new(dim: usize, entries: Vec<(&str, Vec<f64>)>) -> Self {
        let table = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self { dim, table }
    }

    /// Determiners near the origin, nouns near (5, 5), verbs near (-5, 5).
    pub(crate) fn animals() -> Self {
        Self::new(
            2,
            vec![
                ("the", vec![0.0, 0.2]),
                ("a", vec![0.3, -0.1]),
                ("dog", vec![5.0, 5.1]),
                ("dogs", vec![5.3, 4.8]),
                ("cat", vec![4.7, 5.2]),
                ("runs", vec![-5.0, 5.0]),
                ("run", vec![-5.2, 4.9]),
                ("sleeps", vec![-4.8, 5.3]),
            ],
        )
    }
}

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, token: &str) -> Vec<f64> {
        self.table
            .get(token)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dim])
    }
}

/// Build a sample from `(token, tag)` pairs.
pub(crate) fn sample(pairs: &[(&str, &str)]) -> Sample {
    Sample {
        tokens: pairs.iter().map(|(t, _)| t.to_string()).collect(),
        tags: pairs.iter().map(|(_, g)| g.to_string()).collect(),
    }
}
