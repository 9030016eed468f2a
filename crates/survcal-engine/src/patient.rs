use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::ModelError;

/// Health state of a simulated patient.
///
/// `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum HealthState {
    Alive,
    Dead,
}

/// Probability that an alive patient dies during one time step.
///
/// Always finite and within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, derive_more::Display)]
#[display("{_0}")]
pub struct MortalityProb(f64);

impl MortalityProb {
    /// Validates `value` as a mortality probability.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidMortalityProb`] if `value` is not a finite
    /// number in `[0, 1]`.
    pub fn new(value: f64) -> Result<Self, ModelError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ModelError::InvalidMortalityProb { value })
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Multiplies the probability by `ratio`, e.g. a drug effectiveness ratio.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidMortalityProb`] if the product leaves `[0, 1]`.
    pub fn scaled(self, ratio: f64) -> Result<Self, ModelError> {
        Self::new(self.0 * ratio)
    }
}

impl TryFrom<f64> for MortalityProb {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A single simulated individual.
///
/// The patient id doubles as the seed of its random stream, so two patients
/// with the same id and mortality probability follow the same trajectory.
///
/// # Example
///
/// ```
/// use survcal_engine::{HealthState, MortalityProb, Patient};
///
/// let mut patient = Patient::new(42, MortalityProb::new(1.0)?);
/// patient.simulate(10);
///
/// assert_eq!(patient.state(), HealthState::Dead);
/// assert_eq!(patient.survival_time(), Some(1));
/// # Ok::<(), survcal_engine::ModelError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Patient {
    id: u64,
    mortality_prob: MortalityProb,
    state: HealthState,
    survival_time: Option<usize>,
}

impl Patient {
    /// Creates an alive patient.
    #[must_use]
    pub const fn new(id: u64, mortality_prob: MortalityProb) -> Self {
        Self {
            id,
            mortality_prob,
            state: HealthState::Alive,
            survival_time: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub const fn mortality_prob(&self) -> MortalityProb {
        self.mortality_prob
    }

    #[must_use]
    pub const fn state(&self) -> HealthState {
        self.state
    }

    /// Time step at which the patient died, or `None` while alive or censored.
    #[must_use]
    pub const fn survival_time(&self) -> Option<usize> {
        self.survival_time
    }

    /// Returns `true` if the patient was alive at the end of the horizon.
    #[must_use]
    pub const fn is_censored(&self) -> bool {
        self.survival_time.is_none()
    }

    /// Simulates time steps `1..=n_time_steps`.
    ///
    /// One uniform `[0, 1)` variate is drawn per step; a draw below the
    /// mortality probability kills the patient and stops the simulation. A
    /// patient who is already dead is left unchanged.
    pub fn simulate(&mut self, n_time_steps: usize) {
        if self.state.is_dead() {
            return;
        }

        let mut rng = Pcg32::seed_from_u64(self.id);
        let mortality_prob = self.mortality_prob.value();
        for step in 1..=n_time_steps {
            if rng.random::<f64>() < mortality_prob {
                self.state = HealthState::Dead;
                self.survival_time = Some(step);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prob(value: f64) -> MortalityProb {
        MortalityProb::new(value).unwrap()
    }

    mod mortality_prob {
        use super::*;

        #[test]
        fn test_accepts_bounds() {
            assert_eq!(prob(0.0).value(), 0.0);
            assert_eq!(prob(1.0).value(), 1.0);
        }

        #[test]
        fn test_rejects_out_of_range() {
            for value in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
                assert!(matches!(
                    MortalityProb::new(value),
                    Err(ModelError::InvalidMortalityProb { .. })
                ));
            }
        }

        #[test]
        fn test_scaled() {
            assert!((prob(0.1).scaled(0.5).unwrap().value() - 0.05).abs() < 1e-15);
            assert!(prob(0.6).scaled(2.0).is_err());
        }

        #[test]
        fn test_try_from() {
            assert_eq!(MortalityProb::try_from(0.25), Ok(prob(0.25)));
        }
    }

    #[test]
    fn test_zero_mortality_is_censored() {
        let mut patient = Patient::new(7, prob(0.0));
        patient.simulate(10);
        assert_eq!(patient.state(), HealthState::Alive);
        assert!(patient.is_censored());
        assert_eq!(patient.survival_time(), None);
    }

    #[test]
    fn test_certain_mortality_dies_at_first_step() {
        for id in 0..20 {
            let mut patient = Patient::new(id, prob(1.0));
            patient.simulate(10);
            assert_eq!(patient.state(), HealthState::Dead);
            assert_eq!(patient.survival_time(), Some(1));
        }
    }

    #[test]
    fn test_same_id_same_trajectory() {
        for id in [0, 1, 12_345, u64::MAX] {
            let mut first = Patient::new(id, prob(0.1));
            let mut second = Patient::new(id, prob(0.1));
            // Unrelated simulation in between must not affect the second run
            Patient::new(id.wrapping_add(1), prob(0.3)).simulate(50);
            first.simulate(100);
            second.simulate(100);
            assert_eq!(first.state(), second.state());
            assert_eq!(first.survival_time(), second.survival_time());
        }
    }

    #[test]
    fn test_death_time_within_horizon() {
        for id in 0..200 {
            let mut patient = Patient::new(id, prob(0.2));
            patient.simulate(15);
            if let Some(time) = patient.survival_time() {
                assert!((1..=15).contains(&time));
                assert!(patient.state().is_dead());
            } else {
                assert!(patient.state().is_alive());
            }
        }
    }

    #[test]
    fn test_zero_horizon_is_censored() {
        let mut patient = Patient::new(3, prob(1.0));
        patient.simulate(0);
        assert!(patient.is_censored());
    }

    #[test]
    fn test_dead_patient_is_terminal() {
        let mut patient = Patient::new(5, prob(1.0));
        patient.simulate(10);
        patient.simulate(10);
        assert_eq!(patient.survival_time(), Some(1));
    }
}
