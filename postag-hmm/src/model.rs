//! The hidden Markov model: states, sparse log-space tables, and emissions.
//!
//! Initial and transition probabilities are kept as sparse maps. An entry
//! that was never observed is simply absent and reads back as
//! [`LogProb::impossible`] through [`postag_core::prob::lookup`], which is the
//! only place absent entries are interpreted.
//!
//! Every model has a terminal state. It emits nothing, has no outgoing
//! transitions, and a valid state sequence must be able to step into it
//! after its last position.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::Rng;

use postag_core::prob::lookup;
use postag_core::{LogProb, PostagError, Result, Summarizable};

use crate::emission::{EmissionSource, Emitter};

/// A hidden state: a tag label or the reserved terminal sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum State {
    /// End-of-sequence sink.
    Terminal,
    /// A part-of-speech tag.
    Tag(String),
}

static TERMINAL: State = State::Terminal;

impl State {
    /// A tag state.
    pub fn tag(label: impl Into<String>) -> Self {
        State::Tag(label.into())
    }

    /// Whether this is the terminal sentinel.
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Terminal)
    }

    /// The tag label, or `None` for the terminal state.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            State::Tag(label) => Some(label),
            State::Terminal => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Terminal => f.write_str("<end>"),
            State::Tag(label) => f.write_str(label),
        }
    }
}

impl From<&str> for State {
    fn from(label: &str) -> Self {
        State::tag(label)
    }
}

/// An ordered `(from, to)` pair of states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transition {
    pub from: State,
    pub to: State,
}

impl Transition {
    pub fn new(from: State, to: State) -> Self {
        Self { from, to }
    }
}

/// A hidden Markov model with sparse log-space tables and an emission model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HiddenMarkovModel {
    /// State enumeration; fixes iteration order only.
    states: Vec<State>,
    initial: HashMap<State, LogProb>,
    transitions: HashMap<Transition, LogProb>,
    emitter: Emitter,
}

impl HiddenMarkovModel {
    /// Build a model after validating its structural invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `states` does not contain the terminal state, or repeats a state
    /// - an initial or transition entry names an unknown state
    /// - the terminal state has an initial entry or an outgoing transition
    /// - the emitter covers a state outside `states`
    /// - a log-probability is NaN or positive
    pub fn new(
        states: Vec<State>,
        initial: HashMap<State, LogProb>,
        transitions: HashMap<Transition, LogProb>,
        emitter: Emitter,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(states.len());
        for s in &states {
            if !seen.insert(s) {
                return Err(PostagError::InvalidInput(format!("duplicate state {s}")));
            }
        }
        if !seen.contains(&State::Terminal) {
            return Err(PostagError::InvalidInput(
                "state set must include the terminal state".into(),
            ));
        }

        let check_lp = |lp: LogProb, what: &dyn fmt::Display| -> Result<()> {
            if lp.value().is_nan() || lp.value() > 1e-9 {
                return Err(PostagError::InvalidInput(format!(
                    "{what}: invalid log-probability {}",
                    lp.value()
                )));
            }
            Ok(())
        };

        for (s, &lp) in &initial {
            if !seen.contains(s) {
                return Err(PostagError::InvalidInput(format!(
                    "initial entry for unknown state {s}"
                )));
            }
            if s.is_terminal() {
                return Err(PostagError::InvalidInput(
                    "the terminal state cannot start a sequence".into(),
                ));
            }
            check_lp(lp, &format_args!("initial[{s}]"))?;
        }

        for (t, &lp) in &transitions {
            if !seen.contains(&t.from) || !seen.contains(&t.to) {
                return Err(PostagError::InvalidInput(format!(
                    "transition {} -> {} names an unknown state",
                    t.from, t.to
                )));
            }
            if t.from.is_terminal() {
                return Err(PostagError::InvalidInput(format!(
                    "the terminal state has no outgoing transitions (found -> {})",
                    t.to
                )));
            }
            check_lp(lp, &format_args!("transition[{} -> {}]", t.from, t.to))?;
        }

        for s in emitter.states() {
            if !seen.contains(s) {
                return Err(PostagError::InvalidInput(format!(
                    "emission distribution for unknown state {s}"
                )));
            }
        }

        Ok(Self {
            states,
            initial,
            transitions,
            emitter,
        })
    }

    /// All states, terminal included, in enumeration order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The non-terminal states, in enumeration order.
    pub fn non_terminal_states(&self) -> impl Iterator<Item = &State> {
        self.states.iter().filter(|s| !s.is_terminal())
    }

    /// The terminal state.
    pub fn terminal(&self) -> &State {
        &TERMINAL
    }

    /// Observation dimension.
    pub fn dim(&self) -> usize {
        self.emitter.dim()
    }

    /// The emission model.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Sparse initial table; absent states cannot start a sequence.
    pub fn initial_table(&self) -> &HashMap<State, LogProb> {
        &self.initial
    }

    /// Sparse transition table; absent pairs are impossible.
    pub fn transition_table(&self) -> &HashMap<Transition, LogProb> {
        &self.transitions
    }

    /// Take the model apart into the arguments of [`new`](Self::new).
    ///
    /// Used to re-validate a model that was decoded from bytes.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        Vec<State>,
        HashMap<State, LogProb>,
        HashMap<Transition, LogProb>,
        Emitter,
    ) {
        (self.states, self.initial, self.transitions, self.emitter)
    }

    /// Log-probability that a sequence starts in `state`.
    pub fn initial_log_prob(&self, state: &State) -> LogProb {
        lookup(&self.initial, state)
    }

    /// Log-probability of stepping from `from` to `to`.
    pub fn transition_log_prob(&self, from: &State, to: &State) -> LogProb {
        lookup(&self.transitions, &Transition::new(from.clone(), to.clone()))
    }

    /// Emission log-probabilities of `obs` for each of `states`.
    pub fn emission_log_probs(&self, obs: &[f64], states: &[State]) -> Result<Vec<LogProb>> {
        self.emitter.log_probs(obs, states)
    }

    /// Total log-probability mass of the transitions leaving `state`.
    ///
    /// Zero (certain) for every state that was seen in training, impossible
    /// for states with no outgoing transitions.
    pub fn outgoing_log_mass(&self, state: &State) -> LogProb {
        self.transitions
            .iter()
            .filter(|(t, _)| &t.from == state)
            .map(|(_, &lp)| lp)
            .sum()
    }

    /// Total log-probability mass of the initial table.
    pub fn initial_log_mass(&self) -> LogProb {
        self.initial.values().copied().sum()
    }

    /// Generate one sequence by running the chain forward until it reaches
    /// the terminal state.
    ///
    /// Returns `None` if the chain has not terminated after `max_len`
    /// emissions, or if it reaches a state it cannot leave or emit from.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_len: usize,
    ) -> Option<(Vec<State>, Vec<Vec<f64>>)> {
        let mut state = self.draw(rng, |s| self.initial_log_prob(s))?;
        let mut path = Vec::new();
        let mut observations = Vec::new();
        while !state.is_terminal() {
            if path.len() == max_len {
                return None;
            }
            observations.push(self.emitter.sample(state, rng)?);
            path.push(state.clone());
            let from = state;
            state = self.draw(rng, |s| self.transition_log_prob(from, s))?;
        }
        Some((path, observations))
    }

    /// Draw a state from the categorical distribution given by `weight`,
    /// visiting states in enumeration order.
    fn draw<R, F>(&self, rng: &mut R, weight: F) -> Option<&State>
    where
        R: Rng + ?Sized,
        F: Fn(&State) -> LogProb,
    {
        let u: f64 = rng.gen();
        let mut acc = 0.0;
        let mut last = None;
        for s in &self.states {
            let p = weight(s).to_prob();
            if p <= 0.0 {
                continue;
            }
            acc += p;
            last = Some(s);
            if u < acc {
                return Some(s);
            }
        }
        // Rounding can leave `acc` a hair below 1.
        last
    }
}

impl Summarizable for HiddenMarkovModel {
    fn summary(&self) -> String {
        format!(
            "{} emission HMM: {} tags, {} transitions, dim {}",
            self.emitter.kind(),
            self.states.len() - 1,
            self.transitions.len(),
            self.dim()
        )
    }
}
