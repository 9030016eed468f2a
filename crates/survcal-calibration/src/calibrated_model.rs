use std::path::Path;

use rand::SeedableRng as _;
use rand_pcg::Pcg32;
use survcal_engine::{
    CensoringPolicy, CohortSpec, ModelError, MortalityProb, MultiCohort, MultiCohortOutcomes,
};
use survcal_stats::summary::SummaryStat;

use crate::{
    CalibrationError,
    artifact::{self, CalibrationRow},
    settings::check_alpha,
    weights,
};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Outcome projection from a persisted calibration.
///
/// Each [`simulate`](Self::simulate) call resamples calibration rows by
/// weight and simulates one cohort per resampled row. A resampled row keeps
/// its cohort id, so a cohort of the calibration's population size replays
/// the patients of the calibration run unless the mortality probability was
/// scaled.
///
/// # Example
///
/// ```
/// use survcal_calibration::{CalibratedModel, artifact::CalibrationRow};
///
/// let rows = [
///     CalibrationRow { cohort_id: 0, weight: 0.4, mortality_prob: 0.06 },
///     CalibrationRow { cohort_id: 1, weight: 0.6, mortality_prob: 0.08 },
/// ];
/// let mut model = CalibratedModel::from_rows(&rows, 0.5)?.with_seed(7);
/// model.simulate(20, 100, 200, None)?;
///
/// let (mean, (lower, upper)) = model.mean_survival_time_projection_interval(0.05)?;
/// assert!(lower <= mean && mean <= upper);
/// # Ok::<(), survcal_calibration::CalibrationError>(())
/// ```
#[derive(Debug, Clone)]
pub struct CalibratedModel {
    cohort_ids: Vec<u64>,
    weights: Vec<f64>,
    mortality_probs: Vec<MortalityProb>,
    policy: CensoringPolicy,
    rng: Pcg32,
    projection: Option<Projection>,
}

#[derive(Debug, Clone)]
struct Projection {
    outcomes: MultiCohortOutcomes,
    resampled_probs: SummaryStat,
}

impl CalibratedModel {
    /// Builds a model from artifact rows, multiplying every mortality
    /// probability by `drug_effectiveness_ratio`. Weights are used as given.
    ///
    /// The resampling stream is seeded from OS entropy; see [`Self::with_seed`].
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::ArtifactFormat`] if there are no rows, a
    /// weight is outside `[0, 1]` or the weights do not sum to 1, and
    /// [`CalibrationError::Model`] if a scaled probability leaves `[0, 1]`.
    pub fn from_rows(
        rows: &[CalibrationRow],
        drug_effectiveness_ratio: f64,
    ) -> Result<Self, CalibrationError> {
        Self::build(rows, drug_effectiveness_ratio, "<rows>")
    }

    /// Reads the artifact at `path` and builds a model from it.
    ///
    /// # Errors
    ///
    /// Any error of [`artifact::read_artifact`] or [`Self::from_rows`].
    pub fn load<P>(path: P, drug_effectiveness_ratio: f64) -> Result<Self, CalibrationError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let rows = artifact::read_artifact(path)?;
        log::info!("Loaded {} calibration rows from {}", rows.len(), path.display());
        Self::build(&rows, drug_effectiveness_ratio, &path.display().to_string())
    }

    fn build(
        rows: &[CalibrationRow],
        drug_effectiveness_ratio: f64,
        source: &str,
    ) -> Result<Self, CalibrationError> {
        let format_error = |reason: String| CalibrationError::ArtifactFormat {
            path: source.to_owned(),
            line: 0,
            reason,
        };

        if rows.is_empty() {
            return Err(format_error("no calibration rows".to_owned()));
        }
        if let Some(row) = rows.iter().find(|r| !(0.0..=1.0).contains(&r.weight)) {
            return Err(format_error(format!(
                "weight {} of cohort {} is outside [0, 1]",
                row.weight, row.cohort_id
            )));
        }
        let sum = rows.iter().map(|r| r.weight).sum::<f64>();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format_error(format!("weights sum to {sum}, not 1")));
        }

        let mortality_probs = rows
            .iter()
            .map(|r| MortalityProb::new(r.mortality_prob)?.scaled(drug_effectiveness_ratio))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            cohort_ids: rows.iter().map(|r| r.cohort_id).collect(),
            weights: rows.iter().map(|r| r.weight).collect(),
            mortality_probs,
            policy: CensoringPolicy::default(),
            rng: Pcg32::from_os_rng(),
            projection: None,
        })
    }

    /// Replaces the resampling stream with one seeded by `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Pcg32::seed_from_u64(seed);
        self
    }

    /// Sets how censored patients enter mean survival times.
    #[must_use]
    pub fn with_censoring_policy(mut self, policy: CensoringPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Mortality probabilities after applying the effectiveness ratio.
    #[must_use]
    pub fn mortality_probs(&self) -> &[MortalityProb] {
        &self.mortality_probs
    }

    /// Resamples `num_cohorts` rows by weight and simulates one cohort of
    /// `cohort_size` patients per row over `n_time_steps`.
    ///
    /// Cohorts take the resampled rows' ids unless `cohort_ids` is given, in
    /// which case it must hold exactly `num_cohorts` ids. A later call
    /// replaces the previous projection.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::CohortIdCount`] for a wrong number of
    /// explicit ids and [`CalibrationError::Model`] for invalid cohorts.
    pub fn simulate(
        &mut self,
        num_cohorts: usize,
        cohort_size: usize,
        n_time_steps: usize,
        cohort_ids: Option<Vec<u64>>,
    ) -> Result<&MultiCohortOutcomes, CalibrationError> {
        match cohort_ids.as_ref().map(Vec::len) {
            Some(actual) if actual != num_cohorts => {
                return Err(CalibrationError::CohortIdCount {
                    expected: num_cohorts,
                    actual,
                });
            }
            _ => {}
        }

        let indices = weights::resample_indices(&self.weights, num_cohorts, &mut self.rng)?;
        let ids = cohort_ids
            .unwrap_or_else(|| indices.iter().map(|&i| self.cohort_ids[i]).collect());
        let specs = ids
            .into_iter()
            .zip(&indices)
            .map(|(id, &i)| CohortSpec {
                id,
                pop_size: cohort_size,
                mortality_prob: self.mortality_probs[i],
            })
            .collect::<Vec<_>>();

        let mut multi_cohort = MultiCohort::new(specs)?;
        let outcomes = multi_cohort.simulate(n_time_steps, self.policy).clone();
        let resampled_probs = SummaryStat::new(
            "Resampled mortality probabilities",
            indices.iter().map(|&i| self.mortality_probs[i].value()),
        )
        .ok_or(ModelError::NoCohorts)?;

        let projection = self.projection.insert(Projection {
            outcomes,
            resampled_probs,
        });
        Ok(&projection.outcomes)
    }

    /// Outcomes of the last [`Self::simulate`] call.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::NotSimulated`] before the first call.
    pub fn outcomes(&self) -> Result<&MultiCohortOutcomes, CalibrationError> {
        Ok(&self.projection()?.outcomes)
    }

    fn projection(&self) -> Result<&Projection, CalibrationError> {
        self.projection.as_ref().ok_or(CalibrationError::NotSimulated)
    }

    /// Mean of the per-cohort mean survival times with its `1 - alpha`
    /// projection interval.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidSetting`] if `alpha` is not in
    /// `(0, 1)`, [`CalibrationError::NotSimulated`] before [`Self::simulate`],
    /// and [`CalibrationError::Model`] if a cohort's mean survival time is
    /// undefined under the censoring policy.
    pub fn mean_survival_time_projection_interval(
        &self,
        alpha: f64,
    ) -> Result<(f64, (f64, f64)), CalibrationError> {
        check_alpha(alpha)?;
        let stats = self.outcomes()?.mean_survival_time_stats()?;
        Ok((stats.mean(), stats.percentile_interval(alpha)))
    }

    /// Mean of the mortality probabilities drawn by the last
    /// [`Self::simulate`] call with its `1 - alpha` credible interval.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidSetting`] if `alpha` is not in
    /// `(0, 1)` and [`CalibrationError::NotSimulated`] before [`Self::simulate`].
    pub fn mortality_estimate_credible_interval(
        &self,
        alpha: f64,
    ) -> Result<(f64, (f64, f64)), CalibrationError> {
        check_alpha(alpha)?;
        let stats = &self.projection()?.resampled_probs;
        Ok((stats.mean(), stats.percentile_interval(alpha)))
    }
}
