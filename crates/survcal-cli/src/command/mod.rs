use clap::{Parser, Subcommand};

use self::{calibrate::CalibrateArg, likelihood::LikelihoodArg, project::ProjectArg};

mod calibrate;
mod likelihood;
mod project;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Calibrate the mortality probability against an observed trial
    Calibrate(#[clap(flatten)] CalibrateArg),
    /// Project survival outcomes from a calibration artifact
    Project(#[clap(flatten)] ProjectArg),
    /// Evaluate the binomial likelihood of a trial at a survival probability
    Likelihood(#[clap(flatten)] LikelihoodArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Calibrate(arg) => calibrate::run(&arg)?,
        Mode::Project(arg) => project::run(&arg)?,
        Mode::Likelihood(arg) => likelihood::run(&arg)?,
    }
    Ok(())
}
