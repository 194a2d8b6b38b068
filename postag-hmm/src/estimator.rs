//! Moment accumulation and regularized Gaussian estimation.
//!
//! A [`GaussianEstimator`] collects the count, first moment, and second
//! moment of the observations seen for one state. [`finalize`] turns them
//! into a [`GaussianDistribution`] via a symmetric eigen-decomposition of the
//! biased sample covariance. Eigenvalues below the variance floor are raised
//! to the floor, so states with very few or collinear observations still
//! produce a positive-definite covariance.
//!
//! [`finalize`]: GaussianEstimator::finalize

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use tracing::debug;

use postag_core::{PostagError, Result};

use crate::gaussian::GaussianDistribution;

/// Smallest variance allowed along any principal direction.
pub const MIN_VARIANCE: f64 = 1e-4;

/// Running sufficient statistics for one state's emission distribution.
#[derive(Debug, Clone)]
pub struct GaussianEstimator {
    dim: usize,
    count: usize,
    first_moment: Vec<f64>,
    /// Upper triangle (`j >= i`) of `Σ x xᵀ`, row-major `d * d`.
    second_moment: Vec<f64>,
}

impl GaussianEstimator {
    /// An empty estimator for `dim`-dimensional observations.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            count: 0,
            first_moment: vec![0.0; dim],
            second_moment: vec![0.0; dim * dim],
        }
    }

    /// Observation dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of observations accumulated so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Accumulate one observation.
    ///
    /// # Errors
    ///
    /// Returns [`PostagError::DimensionMismatch`] if `x.len() != dim()` and
    /// [`PostagError::InvalidInput`] if `x` has a non-finite component. The
    /// accumulators are left untouched on error.
    pub fn update(&mut self, x: &[f64]) -> Result<()> {
        if x.len() != self.dim {
            return Err(PostagError::DimensionMismatch {
                expected: self.dim,
                found: x.len(),
            });
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PostagError::InvalidInput(
                "observation contains a non-finite value".into(),
            ));
        }
        let d = self.dim;
        self.count += 1;
        for i in 0..d {
            self.first_moment[i] += x[i];
            let row = &mut self.second_moment[i * d..(i + 1) * d];
            for j in i..d {
                row[j] += x[i] * x[j];
            }
        }
        Ok(())
    }

    /// Finalize with the default [`MIN_VARIANCE`] floor.
    pub fn finalize(&self) -> Result<GaussianDistribution> {
        self.finalize_with_floor(MIN_VARIANCE)
    }

    /// Convert the accumulated moments into a regularized Gaussian.
    ///
    /// Mean is `Σx / n`, covariance is `Σxxᵀ / n − μμᵀ`. With `C = S Λ Sᵀ`
    /// and every eigenvalue clamped to at least `floor`:
    ///
    /// - `ln det C = Σ ln λᵢ`
    /// - `precision = S Λ⁻¹ Sᵀ`
    /// - `sqrt_covariance = S Λ^{1/2} Sᵀ`
    ///
    /// # Errors
    ///
    /// Returns an error if no observation was accumulated, or if `floor` is
    /// not a positive finite number.
    pub fn finalize_with_floor(&self, floor: f64) -> Result<GaussianDistribution> {
        if self.count == 0 {
            return Err(PostagError::InvalidInput(
                "cannot finalize a gaussian estimator with zero observations".into(),
            ));
        }
        if !(floor > 0.0 && floor.is_finite()) {
            return Err(PostagError::InvalidInput(format!(
                "variance floor must be positive and finite, got {floor}"
            )));
        }

        let d = self.dim;
        let n = self.count as f64;
        let mean: Vec<f64> = self.first_moment.iter().map(|v| v / n).collect();
        let covariance = DMatrix::from_fn(d, d, |i, j| {
            let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
            self.second_moment[lo * d + hi] / n - mean[i] * mean[j]
        });

        let eigen = SymmetricEigen::new(covariance);
        let mut clamped = 0usize;
        let lambdas: Vec<f64> = eigen
            .eigenvalues
            .iter()
            .map(|&l| {
                if l < floor {
                    clamped += 1;
                    floor
                } else {
                    l
                }
            })
            .collect();

        let log_det: f64 = lambdas.iter().map(|l| l.ln()).sum();
        let s = &eigen.eigenvectors;
        let inv = DVector::from_iterator(d, lambdas.iter().map(|l| 1.0 / l));
        let root = DVector::from_iterator(d, lambdas.iter().map(|l| l.sqrt()));
        let precision = s * DMatrix::from_diagonal(&inv) * s.transpose();
        let sqrt_covariance = s * DMatrix::from_diagonal(&root) * s.transpose();

        debug!(dim = d, count = self.count, clamped, log_det, "finalized gaussian");

        GaussianDistribution::from_parts(
            mean,
            symmetric_row_major(&precision),
            symmetric_row_major(&sqrt_covariance),
            log_det,
        )
    }
}

/// Flatten a (numerically) symmetric matrix to row-major, averaging `m` and `mᵀ`.
fn symmetric_row_major(m: &DMatrix<f64>) -> Vec<f64> {
    let d = m.nrows();
    let mut out = Vec::with_capacity(d * d);
    for i in 0..d {
        for j in 0..d {
            out.push(0.5 * (m[(i, j)] + m[(j, i)]));
        }
    }
    out
}
