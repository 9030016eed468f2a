use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// Tunable parameters of a calibration run.
///
/// Missing fields take their default when deserialized, so a settings file
/// only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationSettings {
    /// Population size of every simulated cohort.
    pub pop_size: usize,
    /// Number of simulated time steps.
    pub n_time_steps: usize,
    /// Significance level of reported intervals.
    pub alpha: f64,
    /// Number of posterior draws taken with replacement from the prior samples.
    pub resample_size: usize,
    pub prior: PriorRange,
    /// Seed of the prior and resampling streams.
    pub seed: u64,
    /// Effective sample sizes below this fraction of the prior sample count
    /// are reported as a warning.
    pub ess_warning_fraction: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            pop_size: 1000,
            n_time_steps: 1000,
            alpha: 0.05,
            resample_size: 250,
            prior: PriorRange::default(),
            seed: 1,
            ess_warning_fraction: 0.05,
        }
    }
}

impl CalibrationSettings {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidPrior`] for an unusable prior range
    /// and [`CalibrationError::InvalidSetting`] for any other bad field.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.prior.validate()?;
        if self.pop_size == 0 {
            return Err(invalid("pop_size", "must be positive"));
        }
        if self.resample_size == 0 {
            return Err(invalid("resample_size", "must be positive"));
        }
        check_alpha(self.alpha)?;
        if !(0.0..=1.0).contains(&self.ess_warning_fraction) {
            return Err(invalid(
                "ess_warning_fraction",
                format!("{} is outside [0, 1]", self.ess_warning_fraction),
            ));
        }
        Ok(())
    }
}

/// Rejects significance levels outside `(0, 1)`.
pub(crate) fn check_alpha(alpha: f64) -> Result<(), CalibrationError> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(invalid("alpha", format!("{alpha} is outside (0, 1)")))
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> CalibrationError {
    CalibrationError::InvalidSetting {
        name,
        reason: reason.into(),
    }
}

/// Uniform prior over the per-step mortality probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PriorRange {
    /// Inclusive lower bound.
    pub low: f64,
    /// Exclusive upper bound.
    pub high: f64,
    /// Number of prior draws, one simulated cohort each.
    pub samples: usize,
}

impl Default for PriorRange {
    fn default() -> Self {
        Self {
            low: 0.05,
            high: 0.15,
            samples: 250,
        }
    }
}

impl PriorRange {
    /// # Errors
    ///
    /// Fails unless `0 <= low < high <= 1` and `samples > 0`.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        let Self { low, high, samples } = *self;
        if !(low.is_finite() && high.is_finite() && 0.0 <= low && low < high && high <= 1.0) {
            return Err(CalibrationError::InvalidPrior { low, high });
        }
        if samples == 0 {
            return Err(invalid("prior.samples", "must be positive"));
        }
        Ok(())
    }
}

/// Result of a clinical trial: patients alive after five years out of those enrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTrial {
    n: u64,
    alive: u64,
}

impl ObservedTrial {
    /// # Errors
    ///
    /// Returns [`CalibrationError::InvalidObservation`] if `alive > n`.
    pub fn new(n: u64, alive: u64) -> Result<Self, CalibrationError> {
        if alive > n {
            return Err(CalibrationError::InvalidObservation { n, alive });
        }
        Ok(Self { n, alive })
    }

    #[must_use]
    pub const fn n(&self) -> u64 {
        self.n
    }

    #[must_use]
    pub const fn alive(&self) -> u64 {
        self.alive
    }

    /// Observed five-year survival proportion, or `None` for an empty trial.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn survival_proportion(&self) -> Option<f64> {
        (self.n > 0).then(|| self.alive as f64 / self.n as f64)
    }
}
