//! Statistical utilities for survival calibration.
//!
//! This crate provides the summary-statistics services used by the simulation
//! engine and the calibration layer:
//!
//! - **Descriptive statistics**: mean, median, sample variance, standard deviation
//! - **Percentiles**: linearly interpolated percentiles and percentile intervals
//! - **Summary statistics**: named observation sets with percentile and t intervals
//! - **Distributions**: binomial likelihood, normal and Student's t quantiles
//! - **Survival curves**: step functions of the number of living individuals
//! - **Formatting**: `"estimate (lower, upper)"` display strings
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`percentiles`]: Percentile computation and storage
//! - [`summary`]: Named summaries with interval estimates
//! - [`distribution`]: Probability mass and quantile functions
//! - [`survival`]: Survival curves built from observed death times
//! - [`format`]: Estimate and interval formatting
//!
//! # Examples
//!
//! ## Summarizing a posterior sample
//!
//! ```
//! use survcal_stats::{format::format_estimate_interval, summary::SummaryStat};
//!
//! let samples = [0.07, 0.08, 0.075, 0.072, 0.081];
//! let stat = SummaryStat::new("Posterior samples", samples).unwrap();
//! let text = format_estimate_interval(stat.mean(), stat.percentile_interval(0.05), 3);
//! assert_eq!(text, "0.076 (0.070, 0.081)");
//! ```
//!
//! ## Binomial likelihood of an observed trial
//!
//! ```
//! use survcal_stats::distribution::binomial_pmf;
//!
//! // 400 of 573 patients alive after five years, simulated survival of 55%
//! let weight = binomial_pmf(400, 573, 0.55);
//! assert!(weight > 0.0 && weight < 1e-10);
//! ```
//!
//! ## Building a survival curve
//!
//! ```
//! use survcal_stats::survival::SurvivalCurve;
//!
//! let curve = SurvivalCurve::from_death_times(10, &[1, 1, 4]);
//! assert_eq!(curve.alive_at(3), 8);
//! ```

pub mod descriptive;
pub mod distribution;
pub mod format;
pub mod percentiles;
pub mod summary;
pub mod survival;
