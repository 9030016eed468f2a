use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use survcal_calibration::{Calibration, CalibrationSettings, ObservedTrial};
use survcal_stats::format::{format_estimate_interval, format_percentage};

use crate::{
    report::CalibrationReport,
    util::{self, Output},
};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CalibrateArg {
    /// Number of patients enrolled in the observed trial
    #[arg(long)]
    obs_n: u64,
    /// Number of trial patients alive after five years
    #[arg(long)]
    obs_alive: u64,
    /// Calibration artifact output path
    #[arg(long, default_value = "CalibrationResults.csv")]
    output: PathBuf,
    /// JSON report output path (`-` for stdout)
    #[arg(long)]
    report: Option<PathBuf>,
    /// JSON settings file; missing fields keep their defaults
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Seed of the prior and resampling streams (overrides the settings file)
    #[arg(long)]
    seed: Option<u64>,
    /// Significance level of the credible interval (overrides the settings file)
    #[arg(long)]
    alpha: Option<f64>,
}

pub(crate) fn run(arg: &CalibrateArg) -> anyhow::Result<()> {
    let CalibrateArg {
        obs_n,
        obs_alive,
        output,
        report,
        settings,
        seed,
        alpha,
    } = arg;

    let mut settings = match settings {
        Some(path) => util::read_json_file::<CalibrationSettings, _>("settings", path)?,
        None => CalibrationSettings::default(),
    };
    if let Some(seed) = seed {
        settings.seed = *seed;
    }
    if let Some(alpha) = alpha {
        settings.alpha = *alpha;
    }
    let alpha = settings.alpha;
    let observed = ObservedTrial::new(*obs_n, *obs_alive).context("Invalid observed trial")?;

    let mut calibration =
        Calibration::new(settings.clone()).context("Invalid calibration settings")?;
    let posterior = calibration
        .sample_posterior(&observed)
        .context("Calibration failed")?;
    let (estimate, interval) = posterior.estimate(alpha);
    let ess = posterior.effective_sample_size();

    calibration
        .write_results(output)
        .with_context(|| format!("Failed to save calibration results: {}", output.display()))?;

    println!(
        "Mortality probability estimate and {} credible interval: {}",
        format_percentage(1.0 - alpha, 0),
        format_estimate_interval(estimate, interval, 3)
    );
    println!("Effective sample size: {ess:.1}");
    println!("Calibration results: {}", output.display());

    if let Some(path) = report {
        let report = CalibrationReport {
            calibrated_at: Utc::now(),
            observed,
            settings,
            artifact: output.clone(),
            mortality_estimate: estimate,
            credible_interval: interval,
            effective_sample_size: ess,
        };
        Output::save_json(&report, Some(path.clone()))?;
    }

    Ok(())
}
