//! Bayesian calibration of the survival model against an observed trial.
//!
//! The calibration draws mortality probabilities from a uniform prior,
//! simulates one cohort per draw, weights each draw by the binomial
//! likelihood of the trial's observed five-year survivors, and resamples the
//! draws by weight (sampling-importance-resampling):
//!
//! - [`Calibration`] - Runs the procedure once and exposes the posterior
//! - [`CalibratedModel`] - Projects outcomes from a persisted calibration
//! - [`artifact`] - CSV persistence of the weighted prior draws
//! - [`weights`] - Likelihood weights, normalization and weighted resampling
//!
//! # Example
//!
//! ```
//! use survcal_calibration::{Calibration, CalibrationSettings, ObservedTrial, PriorRange};
//!
//! let settings = CalibrationSettings {
//!     pop_size: 100,
//!     n_time_steps: 10,
//!     resample_size: 50,
//!     prior: PriorRange { low: 0.05, high: 0.15, samples: 50 },
//!     ..CalibrationSettings::default()
//! };
//! let mut calibration = Calibration::new(settings)?;
//! let posterior = calibration.sample_posterior(&ObservedTrial::new(573, 400)?)?;
//!
//! let ess = posterior.effective_sample_size();
//! assert!((1.0..=50.0 + 1e-9).contains(&ess));
//! # Ok::<(), survcal_calibration::CalibrationError>(())
//! ```

use std::io;

use survcal_engine::ModelError;

pub use self::{calibrated_model::*, calibration::*, settings::*};

pub mod artifact;
mod calibrated_model;
mod calibration;
mod settings;
pub mod weights;

/// Errors raised by calibration and projection.
#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum CalibrationError {
    #[display("{_0}")]
    #[from]
    Model(ModelError),
    #[display("invalid observation: {alive} alive out of {n} patients")]
    InvalidObservation { n: u64, alive: u64 },
    #[display("invalid prior range [{low}, {high}]")]
    InvalidPrior { low: f64, high: f64 },
    #[display("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
    #[display("likelihood weights of {sample_count} samples cannot be normalized")]
    DegenerateWeights { sample_count: usize },
    #[display("posterior requested before calibration")]
    NotCalibrated,
    #[display("posterior has already been sampled")]
    AlreadyCalibrated,
    #[display("projection requested before simulation")]
    NotSimulated,
    #[display("expected {expected} cohort ids, got {actual}")]
    CohortIdCount { expected: usize, actual: usize },
    #[display("malformed calibration artifact {path} (line {line}): {reason}")]
    ArtifactFormat {
        path: String,
        line: u64,
        reason: String,
    },
    #[display("I/O error on {path}")]
    Io { path: String, source: io::Error },
}
