//! Viterbi decoding with a mandatory terminal transition.
//!
//! Finds the state path `q₁…qₙ` maximizing
//! `initial(q₁) + Σ emission(oₜ, qₜ) + Σ transition(qₜ₋₁, qₜ) + transition(qₙ, terminal)`
//! in log-space. When no path has a finite score, the input is reported as
//! [`Decoding::Impossible`] rather than as a truncated or empty path.
//!
//! Cost is `O(n · |S|²)` time and `O(n · |S|)` space for the score and
//! backpointer tables.

use std::collections::HashMap;

use postag_core::{LogProb, PostagError, Result};

use crate::model::{HiddenMarkovModel, State};

/// The most probable state path and its joint log-probability.
#[derive(Debug, Clone, PartialEq)]
pub struct BestPath {
    /// One state per observation, in order.
    pub states: Vec<State>,
    /// Joint log-probability of the path, the observations, and termination.
    pub log_prob: f64,
}

impl BestPath {
    /// Tag labels of the path.
    pub fn tags(&self) -> Vec<&str> {
        self.states.iter().filter_map(State::as_tag).collect()
    }
}

/// Outcome of decoding one observation sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoding {
    /// A best path that ends legally in the terminal state.
    Path(BestPath),
    /// Every path has probability zero of ending in the terminal state.
    Impossible,
}

impl Decoding {
    /// Whether the model rejects the sequence.
    pub fn is_impossible(&self) -> bool {
        matches!(self, Decoding::Impossible)
    }

    /// The best path, if there is one.
    pub fn path(&self) -> Option<&BestPath> {
        match self {
            Decoding::Path(p) => Some(p),
            Decoding::Impossible => None,
        }
    }

    /// Consume into the best path, if there is one.
    pub fn into_path(self) -> Option<BestPath> {
        match self {
            Decoding::Path(p) => Some(p),
            Decoding::Impossible => None,
        }
    }
}

/// Dense copies of the sparse tables, indexed by non-terminal state position.
struct DenseTables {
    states: Vec<State>,
    initial: Vec<LogProb>,
    /// Row-major `n * n`: `transition[i * n + j]` is `states[i] -> states[j]`.
    transition: Vec<LogProb>,
    to_terminal: Vec<LogProb>,
}

impl DenseTables {
    fn new(model: &HiddenMarkovModel) -> Self {
        let states: Vec<State> = model.non_terminal_states().cloned().collect();
        let n = states.len();
        let index: HashMap<&State, usize> = states.iter().enumerate().map(|(i, s)| (s, i)).collect();

        let initial = states.iter().map(|s| model.initial_log_prob(s)).collect();
        let mut transition = vec![LogProb::impossible(); n * n];
        let mut to_terminal = vec![LogProb::impossible(); n];
        for (t, &lp) in model.transition_table() {
            let Some(&i) = index.get(&t.from) else { continue };
            if t.to.is_terminal() {
                to_terminal[i] = lp;
            } else if let Some(&j) = index.get(&t.to) {
                transition[i * n + j] = lp;
            }
        }

        Self {
            states,
            initial,
            transition,
            to_terminal,
        }
    }
}

fn validate_observations<O: AsRef<[f64]>>(model: &HiddenMarkovModel, observations: &[O]) -> Result<()> {
    if observations.is_empty() {
        return Err(PostagError::InvalidInput(
            "observation sequence is empty".into(),
        ));
    }
    let dim = model.dim();
    for (t, obs) in observations.iter().enumerate() {
        let obs = obs.as_ref();
        if obs.len() != dim {
            return Err(PostagError::DimensionMismatch {
                expected: dim,
                found: obs.len(),
            });
        }
        if obs.iter().any(|v| !v.is_finite()) {
            return Err(PostagError::InvalidInput(format!(
                "observation[{t}] contains a non-finite value"
            )));
        }
    }
    Ok(())
}

/// Decode the most probable state path for `observations`.
///
/// Ties between equally good predecessors go to the one earliest in the
/// model's state enumeration.
///
/// # Errors
///
/// Returns an error if the sequence is empty, an observation has the wrong
/// dimension, or an observation contains a non-finite value. An input the
/// model cannot explain is not an error: it yields [`Decoding::Impossible`].
pub fn viterbi<O: AsRef<[f64]>>(model: &HiddenMarkovModel, observations: &[O]) -> Result<Decoding> {
    validate_observations(model, observations)?;

    let tables = DenseTables::new(model);
    let n = tables.states.len();
    let t_len = observations.len();

    let mut delta = vec![vec![LogProb::impossible(); n]; t_len];
    let mut psi = vec![vec![0usize; n]; t_len];

    // Initialization
    let em0 = model.emission_log_probs(observations[0].as_ref(), &tables.states)?;
    for j in 0..n {
        delta[0][j] = tables.initial[j].ln_mul(em0[j]);
    }

    // Recursion
    for t in 1..t_len {
        let em = model.emission_log_probs(observations[t].as_ref(), &tables.states)?;
        let live: Vec<usize> = (0..n).filter(|&i| !delta[t - 1][i].is_impossible()).collect();
        if live.is_empty() {
            // Nothing reachable; the remaining rows stay impossible.
            break;
        }
        for j in 0..n {
            let mut best_val = LogProb::impossible();
            let mut best_state = live[0];
            for &i in &live {
                let v = delta[t - 1][i].ln_mul(tables.transition[i * n + j]);
                if v.value() > best_val.value() {
                    best_val = v;
                    best_state = i;
                }
            }
            delta[t][j] = best_val.ln_mul(em[j]);
            psi[t][j] = best_state;
        }
    }

    // Termination: the last state must be able to step into the terminal state.
    let mut best_final = 0usize;
    let mut best_score = LogProb::impossible();
    for j in 0..n {
        let v = delta[t_len - 1][j].ln_mul(tables.to_terminal[j]);
        if v.value() > best_score.value() {
            best_score = v;
            best_final = j;
        }
    }
    if best_score.is_impossible() {
        return Ok(Decoding::Impossible);
    }

    // Backtrack
    let mut path = vec![0usize; t_len];
    path[t_len - 1] = best_final;
    for t in (0..t_len - 1).rev() {
        path[t] = psi[t + 1][path[t + 1]];
    }

    Ok(Decoding::Path(BestPath {
        states: path.into_iter().map(|i| tables.states[i].clone()).collect(),
        log_prob: best_score.value(),
    }))
}

/// Decode many independent sequences against one shared model.
///
/// Sequences are decoded in parallel when the `parallel` feature is enabled;
/// results keep the input order.
///
/// # Errors
///
/// Returns the first error encountered by [`viterbi`].
pub fn decode_batch<S, O>(model: &HiddenMarkovModel, sequences: &[S]) -> Result<Vec<Decoding>>
where
    S: AsRef<[O]> + Sync,
    O: AsRef<[f64]> + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        sequences
            .par_iter()
            .map(|seq| viterbi(model, seq.as_ref()))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    sequences
        .iter()
        .map(|seq| viterbi(model, seq.as_ref()))
        .collect()
}
