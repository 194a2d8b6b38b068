//! Token-level tagging and accuracy evaluation.

use std::fmt;

use tracing::info;

use postag_core::{Embedder, PostagError, Result};

use crate::model::HiddenMarkovModel;
use crate::train::Sample;
use crate::viterbi::{decode_batch, viterbi, Decoding};

/// Samples embedded and decoded together per batch in [`evaluate`].
const EVAL_CHUNK: usize = 256;

/// Embed `tokens` and decode the most probable tag sequence.
///
/// # Errors
///
/// Returns an error if the embedder's dimension differs from the model's, or
/// if `tokens` is empty.
pub fn tag_tokens<E, T>(model: &HiddenMarkovModel, embedder: &E, tokens: &[T]) -> Result<Decoding>
where
    E: Embedder + ?Sized,
    T: AsRef<str>,
{
    check_dim(model, embedder)?;
    let observations: Vec<Vec<f64>> = tokens.iter().map(|t| embedder.embed(t.as_ref())).collect();
    viterbi(model, &observations)
}

fn check_dim<E: Embedder + ?Sized>(model: &HiddenMarkovModel, embedder: &E) -> Result<()> {
    if embedder.dim() != model.dim() {
        return Err(PostagError::DimensionMismatch {
            expected: model.dim(),
            found: embedder.dim(),
        });
    }
    Ok(())
}

/// Token accuracy over a labeled corpus, with impossible sequences counted apart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyReport {
    /// Tokens whose decoded tag equals the gold tag.
    pub correct_tokens: usize,
    /// All gold tokens, including those of impossible sequences.
    pub total_tokens: usize,
    pub total_sequences: usize,
    /// Sequences the model could not tag at all.
    pub impossible_sequences: usize,
}

impl AccuracyReport {
    /// Fraction of all tokens tagged correctly.
    pub fn token_accuracy(&self) -> f64 {
        if self.total_tokens == 0 {
            return 0.0;
        }
        self.correct_tokens as f64 / self.total_tokens as f64
    }

    /// Fraction of sequences reported impossible.
    pub fn impossible_rate(&self) -> f64 {
        if self.total_sequences == 0 {
            return 0.0;
        }
        self.impossible_sequences as f64 / self.total_sequences as f64
    }
}

impl fmt::Display for AccuracyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Got {}/{} for {:.02}% accuracy ({:.02}% of sequences impossible)",
            self.correct_tokens,
            self.total_tokens,
            100.0 * self.token_accuracy(),
            100.0 * self.impossible_rate()
        )
    }
}

/// Tag every sample and compare against its gold tags.
///
/// Empty samples are skipped. Samples are embedded in chunks and each chunk
/// is decoded with [`decode_batch`].
///
/// # Errors
///
/// Returns an error if a sample's tokens and tags differ in length or the
/// embedder's dimension differs from the model's.
pub fn evaluate<E: Embedder + ?Sized>(
    model: &HiddenMarkovModel,
    embedder: &E,
    samples: &[Sample],
) -> Result<AccuracyReport> {
    check_dim(model, embedder)?;
    for (i, sample) in samples.iter().enumerate() {
        if sample.tokens.len() != sample.tags.len() {
            return Err(PostagError::InvalidInput(format!(
                "sample {i}: {} tokens but {} tags",
                sample.tokens.len(),
                sample.tags.len()
            )));
        }
    }

    let mut report = AccuracyReport::default();
    let nonempty: Vec<&Sample> = samples.iter().filter(|s| !s.is_empty()).collect();
    for chunk in nonempty.chunks(EVAL_CHUNK) {
        let mut batch = Vec::with_capacity(chunk.len());
        for sample in chunk {
            let obs: Vec<Vec<f64>> = sample.tokens.iter().map(|t| embedder.embed(t)).collect();
            batch.push(obs);
        }

        let decoded = decode_batch::<Vec<Vec<f64>>, Vec<f64>>(model, &batch)?;
        for (sample, decoding) in chunk.iter().zip(decoded) {
            report.total_sequences += 1;
            report.total_tokens += sample.tags.len();
            match decoding.into_path() {
                Some(path) => {
                    report.correct_tokens += path
                        .tags()
                        .iter()
                        .zip(&sample.tags)
                        .filter(|(got, want)| **got == want.as_str())
                        .count();
                }
                None => report.impossible_sequences += 1,
            }
        }
    }

    info!(
        sequences = report.total_sequences,
        tokens = report.total_tokens,
        impossible = report.impossible_sequences,
        "evaluated corpus"
    );
    Ok(report)
}
