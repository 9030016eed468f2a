use serde::{Deserialize, Serialize};
use survcal_stats::{summary::SummaryStat, survival::SurvivalCurve};

use crate::{ModelError, MortalityProb, Patient};

/// Time step after which a patient counts as a five-year survivor.
pub const FIVE_YEARS: usize = 5;

/// How right-censored patients enter the mean survival time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CensoringPolicy {
    /// Average over patients who died within the horizon; censored patients
    /// are ignored. Undefined when nobody died.
    #[default]
    ObservedDeathsOnly,
    /// Average over all patients, counting censored patients as surviving
    /// the full horizon.
    CensoredAtHorizon,
}

/// Parameters of one cohort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortSpec {
    pub id: u64,
    pub pop_size: usize,
    pub mortality_prob: MortalityProb,
}

impl CohortSpec {
    /// Validates the parameters of a cohort.
    ///
    /// # Errors
    ///
    /// Fails if `pop_size` is zero, `mortality_prob` is outside `[0, 1]`, or
    /// the derived patient ids would overflow.
    pub fn new(id: u64, pop_size: usize, mortality_prob: f64) -> Result<Self, ModelError> {
        let spec = Self {
            id,
            pop_size,
            mortality_prob: MortalityProb::new(mortality_prob)?,
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.pop_size == 0 {
            return Err(ModelError::InvalidPopulationSize { cohort_id: self.id });
        }
        self.patient_id_base()?;
        Ok(())
    }

    /// Id of the first patient; the last one is `base + pop_size - 1`.
    fn patient_id_base(&self) -> Result<u64, ModelError> {
        let overflow = || ModelError::PatientIdOverflow {
            cohort_id: self.id,
            pop_size: self.pop_size,
        };
        let pop_size = u64::try_from(self.pop_size).map_err(|_| overflow())?;
        let base = self.id.checked_mul(pop_size).ok_or_else(overflow)?;
        base.checked_add(pop_size - 1).ok_or_else(overflow)?;
        Ok(base)
    }
}

/// A population of patients sharing one mortality probability.
///
/// Patient `i` gets id `cohort_id * pop_size + i`, keeping patient seeds
/// distinct across cohorts of equal size.
///
/// # Example
///
/// ```
/// use survcal_engine::{Cohort, CohortSpec};
///
/// let mut cohort = Cohort::new(CohortSpec::new(3, 100, 0.0)?)?;
/// let outcomes = cohort.simulate(10);
///
/// assert_eq!(outcomes.prop_survived_five_years(), 1.0);
/// assert!(outcomes.mean_survival_time().is_err());
/// # Ok::<(), survcal_engine::ModelError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Cohort {
    spec: CohortSpec,
    patient_id_base: u64,
    outcomes: Option<CohortOutcomes>,
}

impl Cohort {
    /// Creates an unsimulated cohort.
    ///
    /// # Errors
    ///
    /// Fails if the population is empty or the patient ids would overflow.
    pub fn new(spec: CohortSpec) -> Result<Self, ModelError> {
        spec.validate()?;
        Ok(Self {
            spec,
            patient_id_base: spec.patient_id_base()?,
            outcomes: None,
        })
    }

    #[must_use]
    pub const fn spec(&self) -> &CohortSpec {
        &self.spec
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.spec.id
    }

    /// Simulates every patient over `n_time_steps` and aggregates the outcomes.
    pub fn simulate(&mut self, n_time_steps: usize) -> &CohortOutcomes {
        let mut builder = OutcomesBuilder::new(self.spec.pop_size);

        for index in 0..self.spec.pop_size as u64 {
            let mut patient = Patient::new(self.patient_id_base + index, self.spec.mortality_prob);
            patient.simulate(n_time_steps);
            builder.extract(&patient);
        }

        let outcomes = builder.finish(self.spec, n_time_steps);
        log::debug!(
            "cohort {}: p={} deaths={} five-year survival={:.3}",
            self.spec.id,
            self.spec.mortality_prob,
            outcomes.death_count(),
            outcomes.prop_survived_five_years(),
        );
        self.outcomes.insert(outcomes)
    }

    /// Outcomes of the last simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotSimulated`] before [`Self::simulate`] is called.
    pub fn outcomes(&self) -> Result<&CohortOutcomes, ModelError> {
        self.outcomes.as_ref().ok_or(ModelError::NotSimulated)
    }
}

#[derive(Debug)]
struct OutcomesBuilder {
    survival_times: Vec<usize>,
    n_survived_five_years: usize,
}

impl OutcomesBuilder {
    fn new(pop_size: usize) -> Self {
        Self {
            survival_times: Vec::with_capacity(pop_size),
            n_survived_five_years: 0,
        }
    }

    fn extract(&mut self, patient: &Patient) {
        match patient.survival_time() {
            Some(time) => {
                self.survival_times.push(time);
                if time > FIVE_YEARS {
                    self.n_survived_five_years += 1;
                }
            }
            // Censored patients outlived the horizon and so the five-year mark
            None => self.n_survived_five_years += 1,
        }
    }

    fn finish(self, spec: CohortSpec, n_time_steps: usize) -> CohortOutcomes {
        let survival_curve = SurvivalCurve::from_death_times(spec.pop_size, &self.survival_times);
        CohortOutcomes {
            cohort_id: spec.id,
            pop_size: spec.pop_size,
            n_time_steps,
            survival_times: self.survival_times,
            n_survived_five_years: self.n_survived_five_years,
            survival_curve,
        }
    }
}

/// Aggregate outcomes of one simulated cohort.
#[derive(Debug, Clone)]
pub struct CohortOutcomes {
    cohort_id: u64,
    pop_size: usize,
    n_time_steps: usize,
    survival_times: Vec<usize>,
    n_survived_five_years: usize,
    survival_curve: SurvivalCurve,
}

impl CohortOutcomes {
    #[must_use]
    pub const fn cohort_id(&self) -> u64 {
        self.cohort_id
    }

    #[must_use]
    pub const fn pop_size(&self) -> usize {
        self.pop_size
    }

    #[must_use]
    pub const fn n_time_steps(&self) -> usize {
        self.n_time_steps
    }

    /// Survival times of patients who died within the horizon, in patient order.
    #[must_use]
    pub fn survival_times(&self) -> &[usize] {
        &self.survival_times
    }

    #[must_use]
    pub fn death_count(&self) -> usize {
        self.survival_times.len()
    }

    #[must_use]
    pub fn censored_count(&self) -> usize {
        self.pop_size - self.survival_times.len()
    }

    /// Number of patients alive after step [`FIVE_YEARS`], censored patients included.
    #[must_use]
    pub const fn five_year_survivor_count(&self) -> usize {
        self.n_survived_five_years
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn prop_survived_five_years(&self) -> f64 {
        self.n_survived_five_years as f64 / self.pop_size as f64
    }

    /// Mean survival time over observed deaths only.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyObservationSet`] if no patient died.
    pub fn mean_survival_time(&self) -> Result<f64, ModelError> {
        self.mean_survival_time_with(CensoringPolicy::ObservedDeathsOnly)
    }

    /// Mean survival time under the given censoring policy.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyObservationSet`] if `policy` is
    /// [`CensoringPolicy::ObservedDeathsOnly`] and no patient died.
    #[expect(clippy::cast_precision_loss)]
    pub fn mean_survival_time_with(&self, policy: CensoringPolicy) -> Result<f64, ModelError> {
        let death_total = self.survival_times.iter().sum::<usize>() as f64;
        match policy {
            CensoringPolicy::ObservedDeathsOnly => {
                if self.survival_times.is_empty() {
                    return Err(ModelError::EmptyObservationSet {
                        cohort_id: self.cohort_id,
                    });
                }
                Ok(death_total / self.survival_times.len() as f64)
            }
            CensoringPolicy::CensoredAtHorizon => {
                let censored_total = (self.censored_count() * self.n_time_steps) as f64;
                Ok((death_total + censored_total) / self.pop_size as f64)
            }
        }
    }

    /// Summary of the observed survival times.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyObservationSet`] if no patient died.
    #[expect(clippy::cast_precision_loss)]
    pub fn survival_time_stats(&self) -> Result<SummaryStat, ModelError> {
        SummaryStat::new(
            format!("Survival times of cohort {}", self.cohort_id),
            self.survival_times.iter().map(|&t| t as f64),
        )
        .ok_or(ModelError::EmptyObservationSet {
            cohort_id: self.cohort_id,
        })
    }

    /// Number of living patients over time.
    #[must_use]
    pub const fn survival_curve(&self) -> &SurvivalCurve {
        &self.survival_curve
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn simulate(id: u64, pop_size: usize, mortality_prob: f64, steps: usize) -> CohortOutcomes {
        let mut cohort = Cohort::new(CohortSpec::new(id, pop_size, mortality_prob).unwrap()).unwrap();
        cohort.simulate(steps).clone()
    }

    mod spec {
        use super::*;

        #[test]
        fn test_rejects_empty_population() {
            assert_eq!(
                CohortSpec::new(4, 0, 0.1),
                Err(ModelError::InvalidPopulationSize { cohort_id: 4 })
            );
        }

        #[test]
        fn test_rejects_invalid_probability() {
            assert!(matches!(
                CohortSpec::new(0, 10, 1.5),
                Err(ModelError::InvalidMortalityProb { .. })
            ));
        }

        #[test]
        fn test_rejects_patient_id_overflow() {
            assert!(matches!(
                CohortSpec::new(u64::MAX / 2, 10, 0.1),
                Err(ModelError::PatientIdOverflow { .. })
            ));
        }
    }

    #[test]
    fn test_new_rejects_hand_built_empty_spec() {
        let spec = CohortSpec {
            id: 1,
            pop_size: 0,
            mortality_prob: MortalityProb::new(0.1).unwrap(),
        };
        assert_eq!(
            Cohort::new(spec).unwrap_err(),
            ModelError::InvalidPopulationSize { cohort_id: 1 }
        );
    }

    #[test]
    fn test_patient_ids_are_offset_by_cohort() {
        // Cohort 1 of size 10 uses patient ids 10..20, so its first patient
        // follows the same stream as a lone patient with id 10.
        let mut cohort = Cohort::new(CohortSpec::new(1, 10, 0.3).unwrap()).unwrap();
        let outcomes = cohort.simulate(40);
        let mut patient = Patient::new(10, MortalityProb::new(0.3).unwrap());
        patient.simulate(40);
        if let Some(time) = patient.survival_time() {
            assert_eq!(outcomes.survival_times()[0], time);
        }
    }

    #[test]
    fn test_outcomes_before_simulate() {
        let cohort = Cohort::new(CohortSpec::new(0, 10, 0.1).unwrap()).unwrap();
        assert_eq!(cohort.outcomes().unwrap_err(), ModelError::NotSimulated);
    }

    #[test]
    fn test_zero_mortality_everyone_censored() {
        let outcomes = simulate(0, 100, 0.0, 10);
        assert_eq!(outcomes.death_count(), 0);
        assert_eq!(outcomes.censored_count(), 100);
        assert_eq!(outcomes.five_year_survivor_count(), 100);
        assert_eq!(outcomes.prop_survived_five_years(), 1.0);
        assert_eq!(
            outcomes.mean_survival_time(),
            Err(ModelError::EmptyObservationSet { cohort_id: 0 })
        );
        assert_eq!(
            outcomes.mean_survival_time_with(CensoringPolicy::CensoredAtHorizon),
            Ok(10.0)
        );
        assert!(outcomes.survival_time_stats().is_err());
        assert_eq!(outcomes.survival_curve().alive_at(10), 100);
    }

    #[test]
    fn test_certain_mortality_everyone_dies_first_step() {
        let outcomes = simulate(2, 50, 1.0, 10);
        assert_eq!(outcomes.survival_times(), &[1; 50]);
        assert_eq!(outcomes.mean_survival_time(), Ok(1.0));
        assert_eq!(outcomes.prop_survived_five_years(), 0.0);
        assert_eq!(outcomes.survival_curve().times, vec![1]);
        assert_eq!(outcomes.survival_curve().events, vec![50]);
        assert_eq!(outcomes.survival_curve().alive_at(1), 0);
    }

    #[test]
    fn test_five_year_proportion_in_unit_interval() {
        for (id, p) in [0.0, 0.01, 0.1, 0.3, 0.7, 1.0].into_iter().enumerate() {
            let outcomes = simulate(id as u64, 64, p, 20);
            let prop = outcomes.prop_survived_five_years();
            assert!((0.0..=1.0).contains(&prop), "p={p} prop={prop}");
            assert!(outcomes.five_year_survivor_count() <= outcomes.pop_size());
        }
    }

    #[test]
    fn test_five_year_count_matches_survival_times() {
        let outcomes = simulate(9, 300, 0.15, 30);
        let died_after_five = outcomes
            .survival_times()
            .iter()
            .filter(|&&t| t > FIVE_YEARS)
            .count();
        assert_eq!(
            outcomes.five_year_survivor_count(),
            outcomes.censored_count() + died_after_five
        );
        assert_eq!(
            outcomes.survival_curve().alive_at(FIVE_YEARS),
            outcomes.five_year_survivor_count()
        );
    }

    #[test]
    fn test_censoring_policies_differ() {
        let outcomes = simulate(1, 500, 0.05, 10);
        let deaths_only = outcomes.mean_survival_time().unwrap();
        let at_horizon = outcomes
            .mean_survival_time_with(CensoringPolicy::CensoredAtHorizon)
            .unwrap();
        assert!(deaths_only <= 10.0);
        assert!(at_horizon > deaths_only);
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let first = simulate(5, 200, 0.1, 50);
        let second = simulate(5, 200, 0.1, 50);
        assert_eq!(first.survival_times(), second.survival_times());
    }

    #[test]
    fn test_five_year_proportion_tracks_probability() {
        // P(survive five steps) = 0.9^5
        let outcomes = simulate(0, 5000, 0.1, 100);
        assert_relative_eq!(
            outcomes.prop_survived_five_years(),
            0.9_f64.powi(5),
            epsilon = 0.03
        );
    }
}
