//! Importance weights of prior draws.
//!
//! - [`likelihood`] scores one simulated survival proportion against the trial
//! - [`normalize_l1`] turns raw likelihoods into a probability vector
//! - [`effective_sample_size`] measures how concentrated the weights are
//! - [`resample_indices`] draws indices with replacement in proportion to weight

use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};
use survcal_stats::distribution;

use crate::{CalibrationError, ObservedTrial};

/// Probability of the trial's observed survivors if the true five-year
/// survival probability were `survival_proportion`.
///
/// # Examples
///
/// ```
/// use survcal_calibration::{ObservedTrial, weights};
///
/// let trial = ObservedTrial::new(10, 10)?;
/// assert_eq!(weights::likelihood(&trial, 1.0), 1.0);
/// assert_eq!(weights::likelihood(&trial, 0.0), 0.0);
/// # Ok::<(), survcal_calibration::CalibrationError>(())
/// ```
#[must_use]
pub fn likelihood(observed: &ObservedTrial, survival_proportion: f64) -> f64 {
    distribution::binomial_pmf(observed.alive(), observed.n(), survival_proportion)
}

/// Normalizes `weights` in place so they sum to 1.
///
/// # Errors
///
/// Returns [`CalibrationError::DegenerateWeights`] if the sum is zero or not
/// finite; `weights` is left unchanged in that case.
pub fn normalize_l1(weights: &mut [f64]) -> Result<(), CalibrationError> {
    let sum = weights.iter().sum::<f64>();
    if !(sum.is_finite() && sum > 0.0) {
        return Err(CalibrationError::DegenerateWeights {
            sample_count: weights.len(),
        });
    }
    for w in weights {
        *w /= sum;
    }
    Ok(())
}

/// Kish effective sample size `1 / Σ w²` of normalized weights.
///
/// Ranges from 1 (all mass on one draw) to `weights.len()` (uniform weights).
#[must_use]
pub fn effective_sample_size(normalized_weights: &[f64]) -> f64 {
    1.0 / normalized_weights.iter().map(|w| w * w).sum::<f64>()
}

/// Draws `count` indices into `weights` with replacement, each with
/// probability proportional to its weight.
///
/// # Errors
///
/// Returns [`CalibrationError::DegenerateWeights`] if the weights are empty,
/// negative, or all zero.
pub fn resample_indices<R>(
    weights: &[f64],
    count: usize,
    rng: &mut R,
) -> Result<Vec<usize>, CalibrationError>
where
    R: Rng + ?Sized,
{
    let dist = WeightedIndex::new(weights).map_err(|_| CalibrationError::DegenerateWeights {
        sample_count: weights.len(),
    })?;
    Ok((0..count).map(|_| dist.sample(rng)).collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_likelihood_peaks_at_observed_proportion() {
        let trial = ObservedTrial::new(573, 400).unwrap();
        let at_peak = likelihood(&trial, 400.0 / 573.0);
        assert!(at_peak > likelihood(&trial, 0.6));
        assert!(at_peak > likelihood(&trial, 0.8));
        assert!(at_peak < 1.0);
    }

    #[test]
    fn test_normalize_l1() {
        let mut weights = vec![1.0, 3.0, 0.0, 4.0];
        normalize_l1(&mut weights).unwrap();
        assert_eq!(weights, vec![0.125, 0.375, 0.0, 0.5]);
        assert_abs_diff_eq!(weights.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_normalize_l1_degenerate() {
        for mut weights in [vec![0.0; 3], vec![], vec![1.0, f64::NAN], vec![f64::INFINITY]] {
            let before = weights.clone();
            assert!(matches!(
                normalize_l1(&mut weights),
                Err(CalibrationError::DegenerateWeights { .. })
            ));
            assert_eq!(format!("{before:?}"), format!("{weights:?}"));
        }
    }

    #[test]
    fn test_effective_sample_size_extremes() {
        assert_abs_diff_eq!(effective_sample_size(&[0.25; 4]), 4.0);
        assert_abs_diff_eq!(effective_sample_size(&[0.0, 1.0, 0.0]), 1.0);
        let ess = effective_sample_size(&[0.5, 0.3, 0.2]);
        assert!((1.0..=3.0).contains(&ess));
    }

    #[test]
    fn test_resample_respects_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(3);
        let indices = resample_indices(&[0.0, 0.7, 0.0, 0.3], 500, &mut rng).unwrap();
        assert_eq!(indices.len(), 500);
        assert!(indices.iter().all(|&i| i == 1 || i == 3));
        let ones = indices.iter().filter(|&&i| i == 1).count();
        assert!((250..450).contains(&ones));
    }

    #[test]
    fn test_resample_degenerate() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert!(resample_indices(&[0.0, 0.0], 5, &mut rng).is_err());
        assert!(resample_indices(&[], 5, &mut rng).is_err());
    }
}
