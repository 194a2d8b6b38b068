//! Emission models: per-state observation densities.
//!
//! The decoder only needs one capability from an emission model: given one
//! observation and a list of candidate states, return a log-probability per
//! candidate in the same order. That contract is [`EmissionSource`]. A state
//! the model knows nothing about scores [`LogProb::impossible`] instead of
//! failing.
//!
//! [`Emitter`] is the closed set of emission families a model can carry. It
//! is what gets serialized, so a stored model decodes by matching on the
//! variant tag.

use std::collections::HashMap;

use rand::Rng;

use postag_core::{LogProb, PostagError, Result};

use crate::gaussian::GaussianDistribution;
use crate::model::State;

/// Source of per-state emission log-probabilities for one observation.
pub trait EmissionSource {
    /// Dimension of the observations this source scores.
    fn dim(&self) -> usize;

    /// Log-probability of `obs` under each of `states`, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`PostagError::DimensionMismatch`] if `obs` has the wrong length.
    fn log_probs(&self, obs: &[f64], states: &[State]) -> Result<Vec<LogProb>>;

    /// Whether `state` has an emission distribution.
    fn knows(&self, state: &State) -> bool;
}

/// One multivariate Gaussian per state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianEmitter {
    dim: usize,
    distributions: HashMap<State, GaussianDistribution>,
}

impl GaussianEmitter {
    /// An emitter with no states yet, for `dim`-dimensional observations.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            distributions: HashMap::new(),
        }
    }

    /// Set the distribution for `state`, returning the one it replaces.
    ///
    /// # Errors
    ///
    /// Returns an error for the terminal state (it emits nothing) or a
    /// distribution of the wrong dimension.
    pub fn insert(
        &mut self,
        state: State,
        dist: GaussianDistribution,
    ) -> Result<Option<GaussianDistribution>> {
        if state.is_terminal() {
            return Err(PostagError::InvalidInput(
                "the terminal state has no emission distribution".into(),
            ));
        }
        if dist.dim() != self.dim {
            return Err(PostagError::DimensionMismatch {
                expected: self.dim,
                found: dist.dim(),
            });
        }
        Ok(self.distributions.insert(state, dist))
    }

    /// Distribution for `state`, if any.
    pub fn get(&self, state: &State) -> Option<&GaussianDistribution> {
        self.distributions.get(state)
    }

    /// Number of states with a distribution.
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    /// Whether no state has a distribution.
    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// States that have a distribution, in arbitrary order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.distributions.keys()
    }

    /// Draw an observation from `state`'s distribution.
    pub fn sample<R: Rng + ?Sized>(&self, state: &State, rng: &mut R) -> Option<Vec<f64>> {
        self.distributions.get(state).map(|g| g.sample(rng))
    }
}

impl EmissionSource for GaussianEmitter {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_probs(&self, obs: &[f64], states: &[State]) -> Result<Vec<LogProb>> {
        if obs.len() != self.dim {
            return Err(PostagError::DimensionMismatch {
                expected: self.dim,
                found: obs.len(),
            });
        }
        Ok(states
            .iter()
            .map(|s| match self.distributions.get(s) {
                Some(g) => LogProb(g.log_density_unchecked(obs)),
                None => LogProb::impossible(),
            })
            .collect())
    }

    fn knows(&self, state: &State) -> bool {
        self.distributions.contains_key(state)
    }
}

/// The emission families a [`HiddenMarkovModel`](crate::HiddenMarkovModel) can carry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Emitter {
    /// Continuous embeddings with a Gaussian per state.
    Gaussian(GaussianEmitter),
}

impl Emitter {
    /// Short name of the emission family.
    pub fn kind(&self) -> &'static str {
        match self {
            Emitter::Gaussian(_) => "gaussian",
        }
    }

    /// States that have an emission distribution, in arbitrary order.
    pub fn states(&self) -> Vec<&State> {
        match self {
            Emitter::Gaussian(g) => g.states().collect(),
        }
    }

    /// Draw an observation from `state`, or `None` if the state is unknown.
    pub fn sample<R: Rng + ?Sized>(&self, state: &State, rng: &mut R) -> Option<Vec<f64>> {
        match self {
            Emitter::Gaussian(g) => g.sample(state, rng),
        }
    }
}

impl From<GaussianEmitter> for Emitter {
    fn from(g: GaussianEmitter) -> Self {
        Emitter::Gaussian(g)
    }
}

impl EmissionSource for Emitter {
    fn dim(&self) -> usize {
        match self {
            Emitter::Gaussian(g) => g.dim(),
        }
    }

    fn log_probs(&self, obs: &[f64], states: &[State]) -> Result<Vec<LogProb>> {
        match self {
            Emitter::Gaussian(g) => g.log_probs(obs, states),
        }
    }

    fn knows(&self, state: &State) -> bool {
        match self {
            Emitter::Gaussian(g) => g.knows(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GaussianEstimator;

    fn unit_gaussian(center: &[f64]) -> GaussianDistribution {
        let mut est = GaussianEstimator::new(center.len());
        for k in 0..center.len() {
            let mut lo = center.to_vec();
            let mut hi = center.to_vec();
            lo[k] -= 1.0;
            hi[k] += 1.0;
            est.update(&lo).unwrap();
            est.update(&hi).unwrap();
        }
        est.finalize().unwrap()
    }

    fn emitter() -> GaussianEmitter {
        let mut e = GaussianEmitter::new(2);
        e.insert(State::tag("DET"), unit_gaussian(&[0.0, 0.0])).unwrap();
        e.insert(State::tag("NOUN"), unit_gaussian(&[5.0, 5.0])).unwrap();
        e
    }

    #[test]
    fn log_probs_follow_candidate_order() {
        let e = emitter();
        let states = [State::tag("NOUN"), State::tag("DET")];
        let lps = e.log_probs(&[0.0, 0.0], &states).unwrap();
        assert_eq!(lps.len(), 2);
        assert!(lps[1] > lps[0], "DET should score higher at the origin");
    }

    #[test]
    fn unknown_state_is_impossible() {
        let e = emitter();
        let states = [State::tag("VERB"), State::Terminal, State::tag("DET")];
        let lps = e.log_probs(&[0.0, 0.0], &states).unwrap();
        assert!(lps[0].is_impossible());
        assert!(lps[1].is_impossible());
        assert!(lps[2].value().is_finite());
    }

    #[test]
    fn wrong_observation_dimension_fails() {
        let e = Emitter::from(emitter());
        assert!(matches!(
            e.log_probs(&[0.0], &[State::tag("DET")]),
            Err(PostagError::DimensionMismatch { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn insert_guards_terminal_and_dimension() {
        let mut e = GaussianEmitter::new(2);
        assert!(e.insert(State::Terminal, unit_gaussian(&[0.0, 0.0])).is_err());
        assert!(e.insert(State::tag("X"), unit_gaussian(&[0.0, 0.0, 0.0])).is_err());
        assert!(e.is_empty());
        assert!(e.insert(State::tag("X"), unit_gaussian(&[0.0, 0.0])).unwrap().is_none());
        assert!(e.insert(State::tag("X"), unit_gaussian(&[1.0, 1.0])).unwrap().is_some());
        assert_eq!(e.len(), 1);
    }

    #[test]
    fn enum_dispatch_matches_inner() {
        let inner = emitter();
        let wrapped = Emitter::from(inner.clone());
        let states = [State::tag("DET"), State::tag("NOUN")];
        let obs = [1.0, 2.0];
        assert_eq!(
            inner.log_probs(&obs, &states).unwrap(),
            wrapped.log_probs(&obs, &states).unwrap()
        );
        assert_eq!(wrapped.kind(), "gaussian");
        assert!(wrapped.knows(&State::tag("NOUN")));
        assert!(!wrapped.knows(&State::tag("VERB")));
    }
}
