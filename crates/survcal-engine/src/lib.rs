//! Discrete-time survival simulation.
//!
//! This crate simulates individuals, cohorts, and sets of cohorts under a
//! fixed per-step mortality probability:
//!
//! - [`Patient`] - One individual with a reproducible random stream seeded by its id
//! - [`Cohort`] - A population sharing one mortality probability, plus its [`CohortOutcomes`]
//! - [`MultiCohort`] - Independent cohorts with their own probabilities, plus
//!   cross-cohort [`MultiCohortOutcomes`]
//!
//! # Time Convention
//!
//! Time steps are numbered from 1. A patient who dies records the index of
//! the step whose draw was fatal as its survival time; a patient alive after
//! the last step is right-censored and records no survival time.
//!
//! # Example
//!
//! ```
//! use survcal_engine::{CensoringPolicy, CohortSpec, MultiCohort};
//!
//! let specs = vec![
//!     CohortSpec::new(0, 200, 0.05)?,
//!     CohortSpec::new(1, 200, 0.10)?,
//! ];
//! let mut multi_cohort = MultiCohort::new(specs)?;
//! let outcomes = multi_cohort.simulate(100, CensoringPolicy::ObservedDeathsOnly);
//!
//! let five_year = outcomes.five_year_survival_stats();
//! assert!((0.0..=1.0).contains(&five_year.mean()));
//! # Ok::<(), survcal_engine::ModelError>(())
//! ```

pub use self::{cohort::*, multi_cohort::*, patient::*};

mod cohort;
mod multi_cohort;
mod patient;

/// Errors raised by the simulation model.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ModelError {
    #[display("mortality probability {value} is outside [0, 1]")]
    InvalidMortalityProb { value: f64 },
    #[display("cohort {cohort_id} has an empty population")]
    InvalidPopulationSize { cohort_id: u64 },
    #[display("patient ids of cohort {cohort_id} overflow with population size {pop_size}")]
    PatientIdOverflow { cohort_id: u64, pop_size: usize },
    #[display(
        "cohort parameter lengths differ: {ids} ids, {pop_sizes} population sizes, {mortality_probs} mortality probabilities"
    )]
    LengthMismatch {
        ids: usize,
        pop_sizes: usize,
        mortality_probs: usize,
    },
    #[display("no cohorts to simulate")]
    NoCohorts,
    #[display("cohort {cohort_id} observed no deaths; mean survival time is undefined")]
    EmptyObservationSet { cohort_id: u64 },
    #[display("cohort index {index} out of range for {len} cohorts")]
    CohortIndexOutOfRange { index: usize, len: usize },
    #[display("outcomes requested before simulation")]
    NotSimulated,
}
