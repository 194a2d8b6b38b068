//! GloVe-style word embedding tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use postag_core::{Embedder, PostagError, Result};

/// A token → vector table of fixed width.
///
/// Lookup tries the exact token, then its lower-cased form; tokens missing
/// from the table embed as the zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingTable {
    dim: usize,
    vectors: HashMap<String, Vec<f64>>,
}

impl EmbeddingTable {
    /// An empty table of width `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    /// Add or replace the vector for `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector's length is not the table width or a
    /// component is not finite.
    pub fn insert(&mut self, token: impl Into<String>, vector: Vec<f64>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(PostagError::DimensionMismatch {
                expected: self.dim,
                found: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(PostagError::InvalidInput(
                "embedding vector has a non-finite component".into(),
            ));
        }
        self.vectors.insert(token.into(), vector);
        Ok(())
    }

    /// The stored vector for exactly `token`, if any.
    pub fn get(&self, token: &str) -> Option<&[f64]> {
        self.vectors.get(token).map(Vec::as_slice)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Load a GloVe text file: `word v1 v2 ... vd` per line.
    ///
    /// The width is fixed by the first vector line. Blank lines are skipped.
    /// When a word repeats, its first vector is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value does not parse,
    /// a line's width differs from the first, or the file holds no vectors.
    pub fn load_glove(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PostagError::io_at(path, e))?;
        let table = parse_glove(BufReader::new(file), &path.display().to_string())?;
        info!(
            path = %path.display(),
            words = table.len(),
            dim = table.dim,
            "loaded embedding table"
        );
        Ok(table)
    }

    /// Parse GloVe text held in memory. See [`load_glove`](Self::load_glove).
    pub fn parse_glove_str(text: &str) -> Result<Self> {
        parse_glove(text.as_bytes(), "<string>")
    }
}

fn parse_glove<R: BufRead>(reader: R, source: &str) -> Result<EmbeddingTable> {
    let mut table: Option<EmbeddingTable> = None;

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| {
            PostagError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: line {}: {}", source, line_num + 1, e),
            ))
        })?;
        let mut fields = line.split_whitespace();
        let Some(word) = fields.next() else {
            continue;
        };

        let vector = fields
            .map(|f| {
                f.parse::<f64>().map_err(|_| {
                    PostagError::Parse(format!(
                        "{}: line {}: invalid value '{}' for '{}'",
                        source,
                        line_num + 1,
                        f,
                        word
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if vector.is_empty() {
            return Err(PostagError::Parse(format!(
                "{}: line {}: '{}' has no vector",
                source,
                line_num + 1,
                word
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(PostagError::Parse(format!(
                "{}: line {}: non-finite value for '{}'",
                source,
                line_num + 1,
                word
            )));
        }

        let table = table.get_or_insert_with(|| EmbeddingTable::new(vector.len()));
        if vector.len() != table.dim {
            return Err(PostagError::Parse(format!(
                "{}: line {}: expected {} values for '{}', got {}",
                source,
                line_num + 1,
                table.dim,
                word,
                vector.len()
            )));
        }
        if table.contains(word) {
            warn!(source, line = line_num + 1, word, "duplicate embedding word, keeping first");
            continue;
        }
        table.vectors.insert(word.to_string(), vector);
    }

    table.ok_or_else(|| PostagError::Parse(format!("{source}: no embedding vectors")))
}

impl Embedder for EmbeddingTable {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, token: &str) -> Vec<f64> {
        if let Some(v) = self.vectors.get(token) {
            return v.clone();
        }
        let lower = token.to_lowercase();
        if lower != token {
            if let Some(v) = self.vectors.get(&lower) {
                return v.clone();
            }
        }
        vec![0.0; self.dim]
    }
}
