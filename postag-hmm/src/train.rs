//! Supervised maximum-likelihood training from labeled sequences.
//!
//! Training is a single counting pass followed by normalization:
//!
//! 1. For each sequence, count its first tag as an initial state, every tag
//!    occurrence, every adjacent tag pair, and a synthetic transition from
//!    the last tag into the terminal state. Each position's observation is
//!    accumulated into that tag's [`GaussianEstimator`].
//! 2. Initial log-probability of `s` is `ln(initial[s] / sequences)`;
//!    transition log-probability of `(a, b)` is `ln(count[a, b] / visits[a])`.
//!    Pairs never observed are left out of the tables.
//! 3. Every estimator is finalized into a Gaussian. This step is independent
//!    per state and runs on a worker pool when the `parallel` feature is on.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use postag_core::{Embedder, LogProb, PostagError, Result};

use crate::emission::GaussianEmitter;
use crate::estimator::{GaussianEstimator, MIN_VARIANCE};
use crate::model::{HiddenMarkovModel, State, Transition};

/// One labeled sentence: parallel token and tag sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    pub tokens: Vec<String>,
    pub tags: Vec<String>,
}

impl Sample {
    /// Build a sample, checking that tokens and tags line up.
    ///
    /// # Errors
    ///
    /// Returns an error if the two sequences differ in length.
    pub fn new(tokens: Vec<String>, tags: Vec<String>) -> Result<Self> {
        if tokens.len() != tags.len() {
            return Err(PostagError::InvalidInput(format!(
                "sample has {} tokens but {} tags",
                tokens.len(),
                tags.len()
            )));
        }
        Ok(Self { tokens, tags })
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the sample has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Configuration for [`Trainer`].
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Variance floor applied to every covariance eigenvalue.
    pub min_variance: f64,
    /// Size of the finalization worker pool; `None` uses every available CPU.
    pub workers: Option<usize>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            min_variance: MIN_VARIANCE,
            workers: None,
        }
    }
}

impl TrainerConfig {
    fn validate(&self) -> Result<()> {
        if !(self.min_variance > 0.0 && self.min_variance.is_finite()) {
            return Err(PostagError::InvalidInput(format!(
                "min_variance must be positive and finite, got {}",
                self.min_variance
            )));
        }
        if self.workers == Some(0) {
            return Err(PostagError::InvalidInput("workers must be > 0".into()));
        }
        Ok(())
    }

    fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Accumulates counts and moments, then produces a [`HiddenMarkovModel`].
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    dim: usize,
    /// Registration order; the terminal state comes first.
    states: Vec<State>,
    sequences: usize,
    initial_counts: HashMap<State, usize>,
    transition_counts: HashMap<Transition, usize>,
    visits: HashMap<State, usize>,
    estimators: HashMap<State, GaussianEstimator>,
}

impl Trainer {
    /// A trainer for `dim`-dimensional observations.
    ///
    /// # Errors
    ///
    /// Returns an error if `dim` is zero or the configuration is invalid.
    pub fn new(dim: usize, config: TrainerConfig) -> Result<Self> {
        if dim == 0 {
            return Err(PostagError::InvalidInput("dim must be > 0".into()));
        }
        config.validate()?;
        Ok(Self {
            config,
            dim,
            states: vec![State::Terminal],
            sequences: 0,
            initial_counts: HashMap::new(),
            transition_counts: HashMap::new(),
            visits: HashMap::new(),
            estimators: HashMap::new(),
        })
    }

    /// Number of non-empty sequences observed so far.
    pub fn sequences(&self) -> usize {
        self.sequences
    }

    /// Count one labeled sequence.
    ///
    /// An empty sequence is ignored. The sequence is validated in full before
    /// any count changes, so a failed call leaves the trainer untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the lengths differ, an observation has the wrong
    /// dimension, or an observation has a non-finite component.
    pub fn observe<O, T>(&mut self, observations: &[O], tags: &[T]) -> Result<()>
    where
        O: AsRef<[f64]>,
        T: AsRef<str>,
    {
        if observations.len() != tags.len() {
            return Err(PostagError::InvalidInput(format!(
                "{} observations but {} tags",
                observations.len(),
                tags.len()
            )));
        }
        if tags.is_empty() {
            debug!("skipping empty sequence");
            return Ok(());
        }
        for obs in observations {
            let obs = obs.as_ref();
            if obs.len() != self.dim {
                return Err(PostagError::DimensionMismatch {
                    expected: self.dim,
                    found: obs.len(),
                });
            }
            if obs.iter().any(|v| !v.is_finite()) {
                return Err(PostagError::InvalidInput(
                    "observation contains a non-finite value".into(),
                ));
            }
        }

        self.sequences += 1;
        let states: Vec<State> = tags.iter().map(|t| State::tag(t.as_ref())).collect();
        *self.initial_counts.entry(states[0].clone()).or_insert(0) += 1;

        for (i, (state, obs)) in states.iter().zip(observations).enumerate() {
            let visits = self.visits.entry(state.clone()).or_insert(0);
            if *visits == 0 {
                self.states.push(state.clone());
            }
            *visits += 1;

            self.estimators
                .entry(state.clone())
                .or_insert_with(|| GaussianEstimator::new(self.dim))
                .update(obs.as_ref())?;

            if i > 0 {
                let t = Transition::new(states[i - 1].clone(), state.clone());
                *self.transition_counts.entry(t).or_insert(0) += 1;
            }
        }

        let last = states[states.len() - 1].clone();
        *self
            .transition_counts
            .entry(Transition::new(last, State::Terminal))
            .or_insert(0) += 1;
        Ok(())
    }

    /// Normalize the counts and finalize every emission distribution.
    ///
    /// # Errors
    ///
    /// Returns an error if no non-empty sequence was observed.
    pub fn finish(self) -> Result<HiddenMarkovModel> {
        if self.sequences == 0 {
            return Err(PostagError::InvalidInput(
                "training corpus has no non-empty samples".into(),
            ));
        }
        info!(
            sequences = self.sequences,
            tags = self.states.len() - 1,
            transitions = self.transition_counts.len(),
            "counted training corpus"
        );

        let initial: HashMap<State, LogProb> = self
            .initial_counts
            .into_iter()
            .map(|(s, c)| (s, LogProb::from_ratio(c, self.sequences)))
            .collect();

        let visits = &self.visits;
        let transitions: HashMap<Transition, LogProb> = self
            .transition_counts
            .into_iter()
            .map(|(t, c)| {
                let total = visits.get(&t.from).copied().unwrap_or(0);
                (t, LogProb::from_ratio(c, total))
            })
            .collect();

        let emitter = finalize_emissions(self.estimators, self.dim, &self.config)?;
        HiddenMarkovModel::new(self.states, initial, transitions, emitter.into())
    }
}

/// Turn every estimator into a Gaussian and collect them into one emitter.
///
/// Work items are independent; finished distributions are inserted into the
/// shared emitter under a single lock.
fn finalize_emissions(
    estimators: HashMap<State, GaussianEstimator>,
    dim: usize,
    config: &TrainerConfig,
) -> Result<GaussianEmitter> {
    let floor = config.min_variance;
    let workers = config.worker_count();
    let n_states = estimators.len();
    let emitter = Mutex::new(GaussianEmitter::new(dim));

    let finalize_one = |(state, est): (State, GaussianEstimator)| -> Result<()> {
        let dist = est.finalize_with_floor(floor)?;
        debug!(state = %state, observations = est.count(), "finalized emission");
        emitter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(state, dist)?;
        Ok(())
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| PostagError::InvalidInput(format!("worker pool: {e}")))?;
        let work: Vec<(State, GaussianEstimator)> = estimators.into_iter().collect();
        pool.install(|| work.into_par_iter().try_for_each(finalize_one))?;
    }
    #[cfg(not(feature = "parallel"))]
    estimators.into_iter().try_for_each(finalize_one)?;

    info!(distributions = n_states, workers, "finalized emission distributions");
    Ok(emitter
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner()))
}

/// Train a model from tokenized samples, embedding every token with `embedder`.
///
/// # Errors
///
/// Returns an error if a sample's tokens and tags differ in length, the
/// corpus has no non-empty sample, or the embedder produces vectors whose
/// length differs from its declared dimension.
pub fn train<E: Embedder + ?Sized>(
    samples: &[Sample],
    embedder: &E,
    config: &TrainerConfig,
) -> Result<HiddenMarkovModel> {
    if samples.is_empty() {
        return Err(PostagError::InvalidInput("training corpus is empty".into()));
    }
    let mut trainer = Trainer::new(embedder.dim(), config.clone())?;
    for (i, sample) in samples.iter().enumerate() {
        if sample.tokens.len() != sample.tags.len() {
            return Err(PostagError::InvalidInput(format!(
                "sample {i}: {} tokens but {} tags",
                sample.tokens.len(),
                sample.tags.len()
            )));
        }
        let observations: Vec<Vec<f64>> = sample.tokens.iter().map(|t| embedder.embed(t)).collect();
        trainer.observe(&observations, &sample.tags)?;
    }
    trainer.finish()
}
