//! Hidden Markov Model part-of-speech tagging over continuous token embeddings.
//!
//! Each hidden state is a tag; each state emits embedding vectors according
//! to its own multivariate Gaussian. The crate provides:
//!
//! - **Gaussians**: [`GaussianDistribution`] and the moment-accumulating
//!   [`GaussianEstimator`] with eigenvalue-clamped covariance regularization
//! - **Emission models**: the [`EmissionSource`] contract and the closed
//!   [`Emitter`] enum used at the persistence boundary
//! - **Model**: [`HiddenMarkovModel`] with sparse log-space initial and
//!   transition tables and a mandatory terminal state
//! - **Training**: maximum-likelihood estimation from labeled sequences
//!   ([`Trainer`], [`train`])
//! - **Decoding**: Viterbi search constrained to end in the terminal state
//!   ([`viterbi`], [`Decoding`])
//! - **Tagging**: token-level tagging and accuracy evaluation ([`tagger`])

pub mod emission;
pub mod estimator;
pub mod gaussian;
pub mod model;
pub mod tagger;
pub mod train;
pub mod viterbi;

#[cfg(test)]
mod testing;

pub use emission::{EmissionSource, Emitter, GaussianEmitter};
pub use estimator::{GaussianEstimator, MIN_VARIANCE};
pub use gaussian::GaussianDistribution;
pub use model::{HiddenMarkovModel, State, Transition};
pub use tagger::{evaluate, tag_tokens, AccuracyReport};
pub use train::{train, Sample, Trainer, TrainerConfig};
pub use viterbi::{decode_batch, viterbi, BestPath, Decoding};
