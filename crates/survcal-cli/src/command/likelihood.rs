use anyhow::ensure;
use survcal_calibration::{ObservedTrial, weights};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct LikelihoodArg {
    /// Number of patients enrolled in the observed trial
    #[arg(long)]
    obs_n: u64,
    /// Number of trial patients alive after five years
    #[arg(long)]
    obs_alive: u64,
    /// Five-year survival probability to evaluate
    #[arg(long)]
    p: f64,
}

pub(crate) fn run(arg: &LikelihoodArg) -> anyhow::Result<()> {
    let LikelihoodArg {
        obs_n,
        obs_alive,
        p,
    } = *arg;
    ensure!(
        (0.0..=1.0).contains(&p),
        "survival probability {p} is outside [0, 1]"
    );
    let observed = ObservedTrial::new(obs_n, obs_alive)?;

    let likelihood = weights::likelihood(&observed, p);
    println!("Likelihood of {obs_alive} survivors out of {obs_n} at p = {p}: {likelihood:e}");
    Ok(())
}
