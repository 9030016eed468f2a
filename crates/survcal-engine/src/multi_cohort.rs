use survcal_stats::{summary::SummaryStat, survival::SurvivalCurve};

use crate::{CensoringPolicy, Cohort, CohortOutcomes, CohortSpec, ModelError};

/// A set of independent cohorts, each with its own mortality probability.
///
/// Cohorts are simulated in construction order and addressed by zero-based
/// index. Each patient keeps its id-derived seed, so the outcomes do not
/// depend on the order in which cohorts run.
#[derive(Debug, Clone)]
pub struct MultiCohort {
    cohorts: Vec<Cohort>,
    outcomes: Option<MultiCohortOutcomes>,
}

impl MultiCohort {
    /// Creates an unsimulated set of cohorts.
    ///
    /// # Errors
    ///
    /// Fails if `specs` is empty or any cohort is invalid.
    pub fn new(specs: Vec<CohortSpec>) -> Result<Self, ModelError> {
        if specs.is_empty() {
            return Err(ModelError::NoCohorts);
        }
        let cohorts = specs
            .into_iter()
            .map(Cohort::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            cohorts,
            outcomes: None,
        })
    }

    /// Creates cohorts from index-aligned parameter sequences.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if the sequences differ in
    /// length, or any error of [`CohortSpec::new`].
    pub fn from_parallel(
        ids: &[u64],
        pop_sizes: &[usize],
        mortality_probs: &[f64],
    ) -> Result<Self, ModelError> {
        if ids.len() != pop_sizes.len() || ids.len() != mortality_probs.len() {
            return Err(ModelError::LengthMismatch {
                ids: ids.len(),
                pop_sizes: pop_sizes.len(),
                mortality_probs: mortality_probs.len(),
            });
        }
        let specs = ids
            .iter()
            .zip(pop_sizes)
            .zip(mortality_probs)
            .map(|((&id, &pop_size), &prob)| CohortSpec::new(id, pop_size, prob))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(specs)
    }

    /// Simulates every cohort over `n_time_steps`, then computes the
    /// cross-cohort summaries. Mean survival times follow `policy`.
    pub fn simulate(&mut self, n_time_steps: usize, policy: CensoringPolicy) -> &MultiCohortOutcomes {
        log::info!(
            "Simulating {} cohorts over {n_time_steps} time steps",
            self.cohorts.len()
        );
        let outcomes = self
            .cohorts
            .iter_mut()
            .map(|cohort| cohort.simulate(n_time_steps).clone())
            .collect();
        self.outcomes.insert(MultiCohortOutcomes::new(outcomes, policy))
    }

    /// Outcomes of the last simulation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotSimulated`] before [`Self::simulate`] is called.
    pub fn outcomes(&self) -> Result<&MultiCohortOutcomes, ModelError> {
        self.outcomes.as_ref().ok_or(ModelError::NotSimulated)
    }

    /// Five-year survival proportion of the cohort at `index`.
    pub fn cohort_prob_five_year_survival(&self, index: usize) -> Result<f64, ModelError> {
        Ok(self.outcomes()?.cohort(index)?.prop_survived_five_years())
    }

    /// Mean survival time of the cohort at `index` under the simulated policy.
    pub fn cohort_mean_survival_time(&self, index: usize) -> Result<f64, ModelError> {
        self.outcomes()?.cohort_mean_survival_time(index)
    }
}

/// Per-cohort and cross-cohort outcomes of a simulated [`MultiCohort`].
#[derive(Debug, Clone)]
pub struct MultiCohortOutcomes {
    policy: CensoringPolicy,
    cohorts: Vec<CohortOutcomes>,
    mean_survival_times: Vec<Result<f64, ModelError>>,
    mean_survival_time_stats: Result<SummaryStat, ModelError>,
    five_year_survival_stats: SummaryStat,
}

impl MultiCohortOutcomes {
    fn new(cohorts: Vec<CohortOutcomes>, policy: CensoringPolicy) -> Self {
        let mean_survival_times = cohorts
            .iter()
            .map(|c| c.mean_survival_time_with(policy))
            .collect::<Vec<_>>();

        let mean_survival_time_stats = mean_survival_times
            .iter()
            .cloned()
            .collect::<Result<Vec<_>, _>>()
            .and_then(|means| {
                SummaryStat::new("Mean survival time", means).ok_or(ModelError::NoCohorts)
            });

        let five_year_survival_stats = SummaryStat::new(
            "Five-year survival probability",
            cohorts.iter().map(CohortOutcomes::prop_survived_five_years),
        )
        .unwrap_or_else(|| unreachable!("a multi-cohort holds at least one cohort"));

        Self {
            policy,
            cohorts,
            mean_survival_times,
            mean_survival_time_stats,
            five_year_survival_stats,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> CensoringPolicy {
        self.policy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cohorts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cohorts.is_empty()
    }

    /// All cohort outcomes in construction order.
    #[must_use]
    pub fn cohorts(&self) -> &[CohortOutcomes] {
        &self.cohorts
    }

    pub fn cohort(&self, index: usize) -> Result<&CohortOutcomes, ModelError> {
        self.cohorts
            .get(index)
            .ok_or(ModelError::CohortIndexOutOfRange {
                index,
                len: self.cohorts.len(),
            })
    }

    pub fn cohort_survival_times(&self, index: usize) -> Result<&[usize], ModelError> {
        Ok(self.cohort(index)?.survival_times())
    }

    pub fn cohort_survival_curve(&self, index: usize) -> Result<&SurvivalCurve, ModelError> {
        Ok(self.cohort(index)?.survival_curve())
    }

    pub fn cohort_mean_survival_time(&self, index: usize) -> Result<f64, ModelError> {
        self.cohort(index)?;
        self.mean_survival_times[index].clone()
    }

    /// Five-year survival proportions of all cohorts, in construction order.
    pub fn probs_five_year_survival(&self) -> impl Iterator<Item = f64> + '_ {
        self.cohorts
            .iter()
            .map(CohortOutcomes::prop_survived_five_years)
    }

    /// Summary of the per-cohort mean survival times.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyObservationSet`] naming the first cohort
    /// without deaths when the policy is [`CensoringPolicy::ObservedDeathsOnly`].
    pub fn mean_survival_time_stats(&self) -> Result<&SummaryStat, ModelError> {
        self.mean_survival_time_stats.as_ref().map_err(Clone::clone)
    }

    /// Summary of the per-cohort five-year survival proportions.
    #[must_use]
    pub const fn five_year_survival_stats(&self) -> &SummaryStat {
        &self.five_year_survival_stats
    }
}
