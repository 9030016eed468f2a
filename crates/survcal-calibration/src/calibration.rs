use std::path::Path;

use rand::distr::{Distribution as _, Uniform};
use rand_pcg::Pcg32;
use survcal_engine::{CensoringPolicy, CohortSpec, MultiCohort};
use survcal_stats::{format::format_estimate_interval, summary::SummaryStat};

use crate::{
    CalibrationError, CalibrationSettings, ObservedTrial,
    artifact::{self, CalibrationRow},
    settings::check_alpha,
    weights,
};

const PRIOR_STREAM: u64 = 1;
const RESAMPLE_STREAM: u64 = 2;

/// Sampling-importance-resampling calibration of the mortality probability.
///
/// A calibration starts uncalibrated and moves to the sampled state exactly
/// once, through [`Calibration::sample_posterior`]. Posterior accessors fail
/// with [`CalibrationError::NotCalibrated`] before that.
///
/// Both random streams derive from [`CalibrationSettings::seed`], so equal
/// settings and observations reproduce the same posterior.
#[derive(Debug, Clone)]
pub struct Calibration {
    settings: CalibrationSettings,
    state: CalibrationState,
}

#[derive(Debug, Clone, derive_more::IsVariant)]
enum CalibrationState {
    Uncalibrated,
    Sampled(Posterior),
}

impl Calibration {
    /// # Errors
    ///
    /// Fails if `settings` does not pass [`CalibrationSettings::validate`].
    pub fn new(settings: CalibrationSettings) -> Result<Self, CalibrationError> {
        settings.validate()?;
        Ok(Self {
            settings,
            state: CalibrationState::Uncalibrated,
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.state.is_sampled()
    }

    /// Draws the prior, simulates one cohort per draw, weights each draw by
    /// the likelihood of `observed` and resamples the posterior.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::AlreadyCalibrated`] on a second call and
    /// [`CalibrationError::DegenerateWeights`] if no draw explains `observed`.
    pub fn sample_posterior(
        &mut self,
        observed: &ObservedTrial,
    ) -> Result<&Posterior, CalibrationError> {
        if self.state.is_sampled() {
            return Err(CalibrationError::AlreadyCalibrated);
        }
        let posterior = Posterior::sample(&self.settings, *observed)?;

        let ess = posterior.effective_sample_size();
        #[expect(clippy::cast_precision_loss)]
        let ess_floor = self.settings.ess_warning_fraction * self.settings.prior.samples as f64;
        if ess < ess_floor {
            log::warn!(
                "Effective sample size {ess:.1} is below {ess_floor:.1}; the posterior rests on few prior draws"
            );
        }

        self.state = CalibrationState::Sampled(posterior);
        self.posterior()
    }

    /// # Errors
    ///
    /// Returns [`CalibrationError::NotCalibrated`] before [`Self::sample_posterior`].
    pub fn posterior(&self) -> Result<&Posterior, CalibrationError> {
        match &self.state {
            CalibrationState::Uncalibrated => Err(CalibrationError::NotCalibrated),
            CalibrationState::Sampled(posterior) => Ok(posterior),
        }
    }

    pub fn mortality_resamples(&self) -> Result<&[f64], CalibrationError> {
        Ok(self.posterior()?.mortality_resamples())
    }

    /// Posterior mean of the mortality probability with its `1 - alpha`
    /// credible interval.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidSetting`] if `alpha` is not in
    /// `(0, 1)` and [`CalibrationError::NotCalibrated`] before sampling.
    pub fn posterior_estimate(&self, alpha: f64) -> Result<(f64, (f64, f64)), CalibrationError> {
        check_alpha(alpha)?;
        Ok(self.posterior()?.estimate(alpha))
    }

    /// [`Self::posterior_estimate`] formatted as `"estimate (lower, upper)"`.
    pub fn mortality_estimate_credible_interval(
        &self,
        alpha: f64,
        decimals: usize,
    ) -> Result<String, CalibrationError> {
        let (estimate, interval) = self.posterior_estimate(alpha)?;
        Ok(format_estimate_interval(estimate, interval, decimals))
    }

    pub fn effective_sample_size(&self) -> Result<f64, CalibrationError> {
        Ok(self.posterior()?.effective_sample_size())
    }

    /// Writes every prior draw with its normalized weight to a CSV artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::NotCalibrated`] before sampling, or any
    /// error of [`artifact::write_artifact`].
    pub fn write_results<P>(&self, path: P) -> Result<(), CalibrationError>
    where
        P: AsRef<Path>,
    {
        artifact::write_artifact(path, &self.posterior()?.rows())
    }
}

/// Weighted prior draws and their resample.
#[derive(Debug, Clone)]
pub struct Posterior {
    observed: ObservedTrial,
    cohort_ids: Vec<u64>,
    mortality_samples: Vec<f64>,
    five_year_survivals: Vec<f64>,
    weights: Vec<f64>,
    resample_stats: SummaryStat,
    resamples: Vec<f64>,
}

impl Posterior {
    fn sample(
        settings: &CalibrationSettings,
        observed: ObservedTrial,
    ) -> Result<Self, CalibrationError> {
        let prior = settings.prior;
        log::info!(
            "Sampling {} mortality probabilities from U[{}, {})",
            prior.samples,
            prior.low,
            prior.high
        );
        let uniform = Uniform::new(prior.low, prior.high)
            .map_err(|_| CalibrationError::InvalidPrior {
                low: prior.low,
                high: prior.high,
            })?;
        let mut prior_rng = Pcg32::new(settings.seed, PRIOR_STREAM);
        let mortality_samples = uniform
            .sample_iter(&mut prior_rng)
            .take(prior.samples)
            .collect::<Vec<_>>();

        let cohort_ids = (0..).take(prior.samples).collect::<Vec<u64>>();
        let specs = cohort_ids
            .iter()
            .zip(&mortality_samples)
            .map(|(&id, &p)| CohortSpec::new(id, settings.pop_size, p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut multi_cohort = MultiCohort::new(specs)?;
        let outcomes = multi_cohort.simulate(settings.n_time_steps, CensoringPolicy::default());
        let five_year_survivals = outcomes.probs_five_year_survival().collect::<Vec<_>>();

        let mut weights = five_year_survivals
            .iter()
            .map(|&proportion| weights::likelihood(&observed, proportion))
            .collect::<Vec<_>>();
        weights::normalize_l1(&mut weights)?;

        let mut resample_rng = Pcg32::new(settings.seed, RESAMPLE_STREAM);
        let resamples = weights::resample_indices(&weights, settings.resample_size, &mut resample_rng)?
            .into_iter()
            .map(|i| mortality_samples[i])
            .collect::<Vec<_>>();
        let resample_stats = SummaryStat::new("Posterior samples", resamples.iter().copied())
            .ok_or_else(|| CalibrationError::InvalidSetting {
                name: "resample_size",
                reason: "must be positive".to_owned(),
            })?;
        log::info!(
            "Resampled {} posterior draws; posterior mean {:.4}",
            resamples.len(),
            resample_stats.mean()
        );

        Ok(Self {
            observed,
            cohort_ids,
            mortality_samples,
            five_year_survivals,
            weights,
            resample_stats,
            resamples,
        })
    }

    #[must_use]
    pub const fn observed(&self) -> &ObservedTrial {
        &self.observed
    }

    /// Prior draws in cohort id order.
    #[must_use]
    pub fn mortality_samples(&self) -> &[f64] {
        &self.mortality_samples
    }

    /// Simulated five-year survival proportion of each prior draw.
    #[must_use]
    pub fn five_year_survivals(&self) -> &[f64] {
        &self.five_year_survivals
    }

    /// Normalized likelihood weight of each prior draw.
    #[must_use]
    pub fn normalized_weights(&self) -> &[f64] {
        &self.weights
    }

    /// Posterior draws, taken with replacement from the prior draws.
    #[must_use]
    pub fn mortality_resamples(&self) -> &[f64] {
        &self.resamples
    }

    /// Posterior mean and `1 - alpha` credible interval of the resample.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in `(0, 1)`.
    #[must_use]
    pub fn estimate(&self, alpha: f64) -> (f64, (f64, f64)) {
        (
            self.resample_stats.mean(),
            self.resample_stats.percentile_interval(alpha),
        )
    }

    #[must_use]
    pub fn effective_sample_size(&self) -> f64 {
        weights::effective_sample_size(&self.weights)
    }

    /// Artifact rows, one per prior draw.
    #[must_use]
    pub fn rows(&self) -> Vec<CalibrationRow> {
        self.cohort_ids
            .iter()
            .zip(&self.weights)
            .zip(&self.mortality_samples)
            .map(|((&cohort_id, &weight), &mortality_prob)| CalibrationRow {
                cohort_id,
                weight,
                mortality_prob,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::PriorRange;

    fn small_settings() -> CalibrationSettings {
        CalibrationSettings {
            pop_size: 300,
            n_time_steps: 20,
            resample_size: 200,
            prior: PriorRange {
                low: 0.05,
                high: 0.15,
                samples: 200,
            },
            ..CalibrationSettings::default()
        }
    }

    fn trial() -> ObservedTrial {
        ObservedTrial::new(573, 400).unwrap()
    }

    #[test]
    fn test_accessors_before_sampling() {
        let calibration = Calibration::new(small_settings()).unwrap();
        assert!(!calibration.is_calibrated());
        assert!(matches!(
            calibration.posterior_estimate(0.05),
            Err(CalibrationError::NotCalibrated)
        ));
        assert!(matches!(
            calibration.effective_sample_size(),
            Err(CalibrationError::NotCalibrated)
        ));
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            calibration.write_results(dir.path().join("out.csv")),
            Err(CalibrationError::NotCalibrated)
        ));
    }

    #[test]
    fn test_second_sampling_rejected() {
        let mut calibration = Calibration::new(small_settings()).unwrap();
        calibration.sample_posterior(&trial()).unwrap();
        assert!(calibration.is_calibrated());
        assert!(matches!(
            calibration.sample_posterior(&trial()),
            Err(CalibrationError::AlreadyCalibrated)
        ));
    }

    #[test]
    fn test_posterior_recovers_trial_survival() {
        // 400 of 573 alive after five years implies 1 - (400/573)^(1/5) ≈ 0.069
        let mut calibration = Calibration::new(small_settings()).unwrap();
        let posterior = calibration.sample_posterior(&trial()).unwrap();

        assert_eq!(posterior.mortality_samples().len(), 200);
        assert!(
            posterior
                .mortality_samples()
                .iter()
                .all(|p| (0.05..0.15).contains(p))
        );
        assert_abs_diff_eq!(posterior.normalized_weights().iter().sum::<f64>(), 1.0, epsilon = 1e-9);

        let (mean, (lo, hi)) = posterior.estimate(0.05);
        assert!((0.055..0.085).contains(&mean), "posterior mean {mean}");
        assert!(lo <= mean && mean <= hi);
        assert!(0.05 <= lo && hi < 0.15);

        let ess = posterior.effective_sample_size();
        assert!((1.0..=200.0 + 1e-9).contains(&ess));
        // The likelihood is informative, so the posterior is narrower than the prior
        assert!(ess < 200.0);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut a = Calibration::new(small_settings()).unwrap();
        let mut b = Calibration::new(small_settings()).unwrap();
        let a = a.sample_posterior(&trial()).unwrap();
        let b = b.sample_posterior(&trial()).unwrap();
        assert_eq!(a.rows(), b.rows());
        assert_eq!(a.mortality_resamples(), b.mortality_resamples());
    }

    #[test]
    fn test_different_seed_changes_prior() {
        let mut a = Calibration::new(small_settings()).unwrap();
        let mut b = Calibration::new(CalibrationSettings {
            seed: 2,
            ..small_settings()
        })
        .unwrap();
        let a = a.sample_posterior(&trial()).unwrap();
        let b = b.sample_posterior(&trial()).unwrap();
        assert_ne!(a.mortality_samples(), b.mortality_samples());
    }

    #[test]
    fn test_unexplainable_observation_is_degenerate() {
        // Nobody survives five years at these rates, so every likelihood underflows
        let settings = CalibrationSettings {
            pop_size: 50,
            n_time_steps: 10,
            resample_size: 10,
            prior: PriorRange {
                low: 0.5,
                high: 0.6,
                samples: 20,
            },
            ..CalibrationSettings::default()
        };
        let mut calibration = Calibration::new(settings).unwrap();
        assert!(matches!(
            calibration.sample_posterior(&ObservedTrial::new(573, 573).unwrap()),
            Err(CalibrationError::DegenerateWeights { sample_count: 20 })
        ));
        assert!(!calibration.is_calibrated());
    }

    #[test]
    fn test_write_results_persists_every_draw() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CalibrationResults.csv");
        let mut calibration = Calibration::new(small_settings()).unwrap();
        calibration.sample_posterior(&trial()).unwrap();
        calibration.write_results(&path).unwrap();

        let rows = artifact::read_artifact(&path).unwrap();
        assert_eq!(rows, calibration.posterior().unwrap().rows());
        let ids = rows.iter().map(|r| r.cohort_id).collect::<Vec<_>>();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn test_estimate_rejects_bad_alpha() {
        let mut calibration = Calibration::new(small_settings()).unwrap();
        calibration.sample_posterior(&trial()).unwrap();
        for alpha in [0.0, 1.0, 1.5, -0.1, f64::NAN] {
            assert!(matches!(
                calibration.posterior_estimate(alpha),
                Err(CalibrationError::InvalidSetting { name: "alpha", .. })
            ));
        }
    }

    #[test]
    fn test_formatted_estimate() {
        let mut calibration = Calibration::new(small_settings()).unwrap();
        calibration.sample_posterior(&trial()).unwrap();
        let text = calibration.mortality_estimate_credible_interval(0.05, 3).unwrap();
        let (mean, (lo, hi)) = calibration.posterior_estimate(0.05).unwrap();
        assert_eq!(text, format!("{mean:.3} ({lo:.3}, {hi:.3})"));
    }
}
