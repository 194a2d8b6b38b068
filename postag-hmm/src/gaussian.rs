//! Multivariate Gaussian emission densities.
//!
//! A [`GaussianDistribution`] caches everything density evaluation and
//! sampling need: the mean, the precision (inverse covariance), a symmetric
//! square root of the covariance, and the covariance log-determinant. All
//! matrices are stored flat in row-major order, `d * d` entries each.
//!
//! Distributions are normally produced by
//! [`GaussianEstimator::finalize`](crate::GaussianEstimator::finalize), which
//! guarantees the covariance has been regularized to be positive definite.

use core::f64::consts::PI;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use postag_core::{PostagError, Result};

/// Cap on the Mahalanobis term, so any finite observation has a finite density.
const MAX_QUAD: f64 = 1e300;

/// A multivariate normal distribution with cached precision and log-determinant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianDistribution {
    mean: Vec<f64>,
    /// Inverse covariance, row-major `d * d`.
    precision: Vec<f64>,
    /// Symmetric square root `C^{1/2}` of the covariance, row-major `d * d`.
    sqrt_covariance: Vec<f64>,
    /// `ln det C`.
    log_det: f64,
}

impl GaussianDistribution {
    /// Assemble a distribution from precomputed parameters.
    ///
    /// The caller is responsible for the parameters being mutually
    /// consistent (`precision = (sqrt_covariance²)⁻¹`, `log_det = ln det C`).
    ///
    /// # Errors
    ///
    /// Returns an error if the mean is empty, a matrix is not `d * d`, or any
    /// parameter is non-finite.
    pub fn from_parts(
        mean: Vec<f64>,
        precision: Vec<f64>,
        sqrt_covariance: Vec<f64>,
        log_det: f64,
    ) -> Result<Self> {
        let d = mean.len();
        if d == 0 {
            return Err(PostagError::InvalidInput(
                "gaussian mean must be non-empty".into(),
            ));
        }
        if precision.len() != d * d {
            return Err(PostagError::InvalidInput(format!(
                "precision length {} != d*d {}",
                precision.len(),
                d * d
            )));
        }
        if sqrt_covariance.len() != d * d {
            return Err(PostagError::InvalidInput(format!(
                "sqrt_covariance length {} != d*d {}",
                sqrt_covariance.len(),
                d * d
            )));
        }
        let all_finite = mean
            .iter()
            .chain(&precision)
            .chain(&sqrt_covariance)
            .all(|v| v.is_finite());
        if !all_finite || !log_det.is_finite() {
            return Err(PostagError::InvalidInput(
                "gaussian parameters must be finite".into(),
            ));
        }
        Ok(Self {
            mean,
            precision,
            sqrt_covariance,
            log_det,
        })
    }

    /// Dimension `d` of the vectors this distribution is defined over.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Precision matrix, row-major.
    pub fn precision(&self) -> &[f64] {
        &self.precision
    }

    /// Symmetric covariance square root, row-major.
    pub fn sqrt_covariance(&self) -> &[f64] {
        &self.sqrt_covariance
    }

    /// Natural log of the covariance determinant.
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// Covariance matrix reconstructed as `sqrt_covariance · sqrt_covariance`.
    pub fn covariance(&self) -> Vec<f64> {
        let d = self.dim();
        let a = &self.sqrt_covariance;
        let mut out = vec![0.0; d * d];
        for i in 0..d {
            for j in 0..d {
                out[i * d + j] = (0..d).map(|k| a[i * d + k] * a[k * d + j]).sum();
            }
        }
        out
    }

    /// Log density `ln N(x | mean, C)`.
    ///
    /// Computes `-0.5 * (d·ln(2π) + ln det C + (x-μ)ᵀ P (x-μ))`.
    ///
    /// # Errors
    ///
    /// Returns [`PostagError::DimensionMismatch`] if `x.len() != dim()`.
    pub fn log_density(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.dim() {
            return Err(PostagError::DimensionMismatch {
                expected: self.dim(),
                found: x.len(),
            });
        }
        Ok(self.log_density_unchecked(x))
    }

    /// Log density without the dimension check; `x.len()` must equal `dim()`.
    pub(crate) fn log_density_unchecked(&self, x: &[f64]) -> f64 {
        let d = self.dim();
        let diff: Vec<f64> = x.iter().zip(&self.mean).map(|(a, m)| a - m).collect();
        let mut quad = 0.0;
        for i in 0..d {
            let row = &self.precision[i * d..(i + 1) * d];
            let dot: f64 = row.iter().zip(&diff).map(|(p, v)| p * v).sum();
            quad += diff[i] * dot;
        }
        // Overflow yields inf or NaN (inf - inf); both saturate.
        let quad = if quad.is_nan() { MAX_QUAD } else { quad.min(MAX_QUAD) };
        -0.5 * (d as f64 * (2.0 * PI).ln() + self.log_det + quad)
    }

    /// Draw one vector: `mean + C^{1/2} z` with `z ~ N(0, I)`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let d = self.dim();
        let z: Vec<f64> = (0..d).map(|_| StandardNormal.sample(rng)).collect();
        (0..d)
            .map(|i| {
                let row = &self.sqrt_covariance[i * d..(i + 1) * d];
                self.mean[i] + row.iter().zip(&z).map(|(a, v)| a * v).sum::<f64>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn diag(mean: Vec<f64>, variances: &[f64]) -> GaussianDistribution {
        let d = variances.len();
        let mut precision = vec![0.0; d * d];
        let mut sqrt_cov = vec![0.0; d * d];
        for (i, &v) in variances.iter().enumerate() {
            precision[i * d + i] = 1.0 / v;
            sqrt_cov[i * d + i] = v.sqrt();
        }
        let log_det = variances.iter().map(|v| v.ln()).sum();
        GaussianDistribution::from_parts(mean, precision, sqrt_cov, log_det).unwrap()
    }

    #[test]
    fn standard_normal_density_at_mean() {
        let g = diag(vec![0.0], &[1.0]);
        let lp = g.log_density(&[0.0]).unwrap();
        assert!((lp - (-0.5 * (2.0 * PI).ln())).abs() < 1e-12);
    }

    #[test]
    fn diagonal_density_matches_product_of_univariates() {
        let g = diag(vec![1.0, -2.0], &[4.0, 0.25]);
        let x = [2.0, -1.5];
        let uni = |x: f64, m: f64, v: f64| -0.5 * ((2.0 * PI * v).ln() + (x - m).powi(2) / v);
        let expected = uni(2.0, 1.0, 4.0) + uni(-1.5, -2.0, 0.25);
        assert!((g.log_density(&x).unwrap() - expected).abs() < 1e-10);
    }

    #[test]
    fn density_decreases_away_from_mean() {
        let g = diag(vec![0.0, 0.0, 0.0], &[1.0, 1.0, 1.0]);
        let near = g.log_density(&[0.1, 0.0, 0.0]).unwrap();
        let far = g.log_density(&[5.0, 0.0, 0.0]).unwrap();
        assert!(near > far);
        assert!(far.is_finite());
    }

    #[test]
    fn density_finite_for_extreme_inputs() {
        let g = diag(vec![0.0, 0.0], &[1e-4, 1e-4]);
        let lp = g.log_density(&[1e6, -1e6]).unwrap();
        assert!(lp.is_finite());

        let overflowing = g.log_density(&[1e200, -1e200]).unwrap();
        assert!(overflowing.is_finite());
        assert!(overflowing <= lp);
    }

    #[test]
    fn density_finite_when_cross_terms_overflow() {
        // p * v overflows to +inf and -inf in the same row.
        let g = GaussianDistribution::from_parts(
            vec![0.0, 0.0],
            vec![1e4, -5e3, -5e3, 1e4],
            vec![1.0, 0.0, 0.0, 1.0],
            0.0,
        )
        .unwrap();
        let lp = g.log_density(&[1e305, 1e305]).unwrap();
        assert!(lp.is_finite());
        assert!(lp < -1e299);
    }

    #[test]
    fn dimension_mismatch_fails_fast() {
        let g = diag(vec![0.0, 0.0], &[1.0, 1.0]);
        let err = g.log_density(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            PostagError::DimensionMismatch {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn from_parts_rejects_bad_shapes() {
        assert!(GaussianDistribution::from_parts(vec![], vec![], vec![], 0.0).is_err());
        assert!(GaussianDistribution::from_parts(vec![0.0; 2], vec![1.0; 3], vec![1.0; 4], 0.0).is_err());
        assert!(GaussianDistribution::from_parts(vec![0.0; 2], vec![1.0; 4], vec![1.0; 2], 0.0).is_err());
        assert!(GaussianDistribution::from_parts(vec![f64::NAN], vec![1.0], vec![1.0], 0.0).is_err());
        assert!(GaussianDistribution::from_parts(vec![0.0], vec![1.0], vec![1.0], f64::INFINITY).is_err());
    }

    #[test]
    fn covariance_is_square_of_root() {
        let g = diag(vec![0.0, 0.0], &[9.0, 0.5]);
        let c = g.covariance();
        assert!((c[0] - 9.0).abs() < 1e-12);
        assert!((c[3] - 0.5).abs() < 1e-12);
        assert!(c[1].abs() < 1e-12 && c[2].abs() < 1e-12);
    }

    #[test]
    fn samples_match_mean_and_variance() {
        let g = diag(vec![3.0, -1.0], &[4.0, 0.25]);
        let mut rng = StdRng::seed_from_u64(42);
        let n = 20_000;
        let draws: Vec<Vec<f64>> = (0..n).map(|_| g.sample(&mut rng)).collect();
        for (k, (&mu, &var)) in [3.0, -1.0].iter().zip(&[4.0, 0.25]).enumerate() {
            let mean = draws.iter().map(|x| x[k]).sum::<f64>() / n as f64;
            let v = draws.iter().map(|x| (x[k] - mean).powi(2)).sum::<f64>() / n as f64;
            assert!((mean - mu).abs() < 0.05, "component {k}: mean {mean}");
            assert!((v - var).abs() / var < 0.05, "component {k}: var {v}");
        }
    }

    #[test]
    fn sampling_is_deterministic_for_a_seed() {
        let g = diag(vec![0.0, 1.0], &[1.0, 2.0]);
        let a = g.sample(&mut StdRng::seed_from_u64(7));
        let b = g.sample(&mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }
}
