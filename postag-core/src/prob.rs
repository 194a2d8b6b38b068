//! Log-space probability type for numerically stable computation.
//!
//! [`LogProb`] stores a probability (or density) as its natural logarithm.
//! Negative infinity is a first-class value meaning "impossible", and every
//! combination of an impossible value with anything else stays impossible
//! rather than turning into NaN.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::{PostagError, Result};

/// A probability stored as its natural logarithm: `ln(p)`.
///
/// For probabilities the value is ≤ 0, with 0.0 representing certainty and
/// negative infinity representing impossibility. Log-densities of continuous
/// distributions may be positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogProb(pub f64);

impl LogProb {
    /// Create a [`LogProb`] from a raw probability in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if `p` is outside `[0, 1]` or NaN.
    pub fn from_prob(p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(PostagError::InvalidInput(format!(
                "LogProb::from_prob: p must be in [0, 1], got {p}"
            )));
        }
        Ok(Self(p.ln()))
    }

    /// The log of a relative frequency `count / total`.
    ///
    /// A zero count yields [`LogProb::impossible`].
    pub fn from_ratio(count: usize, total: usize) -> Self {
        if count == 0 || total == 0 {
            return Self::impossible();
        }
        Self((count as f64 / total as f64).ln())
    }

    /// The raw log value.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Convert back to a raw probability.
    pub fn to_prob(self) -> f64 {
        self.0.exp()
    }

    /// Whether this is the impossible event.
    pub fn is_impossible(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    /// Log-sum-exp: compute `ln(exp(self) + exp(other))` without overflow.
    pub fn ln_add(self, other: Self) -> Self {
        if self.is_impossible() {
            return other;
        }
        if other.is_impossible() {
            return self;
        }
        let (max, min) = if self.0 >= other.0 {
            (self.0, other.0)
        } else {
            (other.0, self.0)
        };
        Self(max + (min - max).exp().ln_1p())
    }

    /// Multiply two probabilities in log-space (addition of log values).
    ///
    /// An impossible operand always yields an impossible result.
    pub fn ln_mul(self, other: Self) -> Self {
        if self.is_impossible() || other.is_impossible() {
            return Self::impossible();
        }
        Self(self.0 + other.0)
    }

    /// Certain event: `ln(1) = 0`.
    pub const fn certain() -> Self {
        Self(0.0)
    }

    /// Impossible event: `ln(0) = -∞`.
    pub const fn impossible() -> Self {
        Self(f64::NEG_INFINITY)
    }
}

impl std::iter::Sum for LogProb {
    /// Log-sum-exp over an iterator; the empty sum is impossible.
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::impossible(), LogProb::ln_add)
    }
}

/// Look up a log-probability in a sparse table.
///
/// Entries that were never observed are absent from the table and read back
/// as [`LogProb::impossible`].
pub fn lookup<K, Q>(table: &HashMap<K, LogProb>, key: &Q) -> LogProb
where
    K: Borrow<Q> + Hash + Eq,
    Q: Hash + Eq + ?Sized,
{
    table.get(key).copied().unwrap_or(LogProb::impossible())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_prob_bounds() {
        assert!(LogProb::from_prob(1.5).is_err());
        assert!(LogProb::from_prob(-0.1).is_err());
        assert!(LogProb::from_prob(f64::NAN).is_err());
        assert!(LogProb::from_prob(0.0).unwrap().is_impossible());
        assert_eq!(LogProb::from_prob(1.0).unwrap(), LogProb::certain());
    }

    #[test]
    fn from_ratio_matches_ln() {
        let lp = LogProb::from_ratio(1, 4);
        assert!((lp.value() - 0.25_f64.ln()).abs() < 1e-12);
        assert!(LogProb::from_ratio(0, 4).is_impossible());
        assert_eq!(LogProb::from_ratio(3, 3), LogProb::certain());
    }

    #[test]
    fn impossible_absorbs_in_multiplication() {
        let imp = LogProb::impossible();
        assert!(imp.ln_mul(LogProb(-2.0)).is_impossible());
        assert!(LogProb(3.0).ln_mul(imp).is_impossible());
        assert!(!imp.ln_mul(LogProb(f64::INFINITY)).value().is_nan());
    }

    #[test]
    fn ln_add_stable() {
        let r = LogProb(-1000.0).ln_add(LogProb(-1001.0));
        assert!(r.value().is_finite());
        assert!(r.value() > -1000.0 && r.value() < -999.0);
        assert_eq!(LogProb::impossible().ln_add(LogProb(-3.0)), LogProb(-3.0));
    }

    #[test]
    fn sum_of_split_distribution_is_certain() {
        let total: LogProb = [1usize, 2, 3]
            .iter()
            .map(|&c| LogProb::from_ratio(c, 6))
            .sum();
        assert!(total.value().abs() < 1e-12);
        let empty: LogProb = std::iter::empty().sum();
        assert!(empty.is_impossible());
    }

    #[test]
    fn lookup_absent_is_impossible() {
        let mut table: HashMap<String, LogProb> = HashMap::new();
        table.insert("a".into(), LogProb(-0.5));
        assert_eq!(lookup(&table, "a"), LogProb(-0.5));
        assert!(lookup(&table, "b").is_impossible());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ln_add_is_commutative(a in -500.0f64..10.0, b in -500.0f64..10.0) {
            let x = LogProb(a).ln_add(LogProb(b));
            let y = LogProb(b).ln_add(LogProb(a));
            prop_assert!((x.value() - y.value()).abs() < 1e-9);
            prop_assert!(x.value() >= a.max(b) - 1e-12);
        }

        #[test]
        fn ln_mul_never_nan(a in prop::num::f64::ANY) {
            let r = LogProb::impossible().ln_mul(LogProb(a));
            prop_assert!(r.is_impossible());
        }
    }
}
