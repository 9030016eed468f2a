use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use survcal_calibration::{CalibrationSettings, ObservedTrial};

/// Summary of a calibration run, saved next to the artifact.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationReport {
    pub calibrated_at: DateTime<Utc>,
    pub observed: ObservedTrial,
    pub settings: CalibrationSettings,
    pub artifact: PathBuf,
    pub mortality_estimate: f64,
    pub credible_interval: (f64, f64),
    pub effective_sample_size: f64,
}
