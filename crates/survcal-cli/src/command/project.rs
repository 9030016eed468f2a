use std::path::PathBuf;

use anyhow::{Context as _, ensure};
use survcal_calibration::{CalibratedModel, artifact};
use survcal_engine::CensoringPolicy;
use survcal_stats::format::{format_estimate_interval, format_percentage};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum Censoring {
    /// Mean over observed deaths only
    #[default]
    Deaths,
    /// Censored patients count as surviving the whole horizon
    Horizon,
}

impl From<Censoring> for CensoringPolicy {
    fn from(censoring: Censoring) -> Self {
        match censoring {
            Censoring::Deaths => Self::ObservedDeathsOnly,
            Censoring::Horizon => Self::CensoredAtHorizon,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ProjectArg {
    /// Calibration artifact written by `calibrate`
    #[arg(long, default_value = "CalibrationResults.csv")]
    input: PathBuf,
    /// Multiplier applied to every calibrated mortality probability
    #[arg(long, default_value_t = 1.0)]
    drug_effectiveness: f64,
    /// Number of simulated cohorts
    #[arg(long, default_value_t = 250)]
    num_cohorts: usize,
    /// Patients per simulated cohort
    #[arg(long, default_value_t = 1000)]
    cohort_size: usize,
    /// Number of simulated time steps
    #[arg(long, default_value_t = 1000)]
    time_steps: usize,
    /// Seed of the resampling stream; OS entropy when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Significance level of the reported intervals
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,
    /// Mean survival time convention: `deaths` or `horizon`
    #[arg(long, default_value = "deaths")]
    censoring: Censoring,
    /// Write the survival curve of every cohort to this CSV file
    #[arg(long)]
    curves: Option<PathBuf>,
}

pub(crate) fn run(arg: &ProjectArg) -> anyhow::Result<()> {
    let ProjectArg {
        input,
        drug_effectiveness,
        num_cohorts,
        cohort_size,
        time_steps,
        seed,
        alpha,
        censoring,
        curves,
    } = arg;
    ensure!(
        *alpha > 0.0 && *alpha < 1.0,
        "significance level {alpha} is outside (0, 1)"
    );

    let mut model = CalibratedModel::load(input, *drug_effectiveness)
        .with_context(|| format!("Failed to load calibration results: {}", input.display()))?
        .with_censoring_policy((*censoring).into());
    if let Some(seed) = seed {
        model = model.with_seed(*seed);
    }

    let outcomes = model
        .simulate(*num_cohorts, *cohort_size, *time_steps, None)
        .context("Projection failed")?;
    let five_year = outcomes.five_year_survival_stats();
    let five_year_line = format_estimate_interval(
        five_year.mean(),
        five_year.percentile_interval(*alpha),
        3,
    );

    if let Some(path) = curves {
        let rows = outcomes.cohorts().iter().enumerate().flat_map(|(i, cohort)| {
            cohort
                .survival_curve()
                .points()
                .map(move |(time, alive)| [i, time, alive])
        });
        artifact::write_rows(path, &["Cohort", "Time", "Alive"], rows)
            .with_context(|| format!("Failed to save survival curves: {}", path.display()))?;
        eprintln!("Survival curves saved to {}", path.display());
    }

    let level = format_percentage(1.0 - alpha, 0);
    let (mean, interval) = model
        .mean_survival_time_projection_interval(*alpha)
        .context("Mean survival time is undefined; try `--censoring horizon`")?;
    println!(
        "Mean survival time and {level} projection interval: {}",
        format_estimate_interval(mean, interval, 2)
    );
    let means = model.outcomes()?.mean_survival_time_stats()?;
    if let Some(interval) = means.t_confidence_interval(*alpha) {
        println!(
            "{} and {level} confidence interval of the mean: {} (std. dev. {:.2})",
            means.name(),
            format_estimate_interval(means.mean(), interval, 2),
            means.descriptive().std_dev
        );
    }
    println!("Five-year survival probability and {level} projection interval: {five_year_line}");

    let (estimate, interval) = model.mortality_estimate_credible_interval(*alpha)?;
    println!(
        "Mortality probability and {level} credible interval: {}",
        format_estimate_interval(estimate, interval, 3)
    );

    Ok(())
}
