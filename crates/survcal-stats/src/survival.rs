/// Step-function survival curve: number of living individuals over time.
///
/// The curve starts at the initial population size and drops by the number
/// of deaths observed at each time step. Deaths sharing a time step collapse
/// into a single decrement of matching magnitude, so `times` is strictly
/// increasing.
///
/// The curve stores parallel vectors, one entry per time step with at least
/// one death:
/// - Time step of the decrement
/// - Number of deaths at that time step
/// - Number of individuals still alive after the decrement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurvivalCurve {
    /// Population size before any death.
    pub initial_size: usize,
    /// Time steps at which at least one death occurred, ascending.
    pub times: Vec<usize>,
    /// Number of deaths at each corresponding time step.
    pub events: Vec<usize>,
    /// Number of individuals alive after each corresponding time step.
    pub alive: Vec<usize>,
}

impl SurvivalCurve {
    /// Builds the curve from the death times observed in a population.
    ///
    /// Censored individuals contribute no death time and simply remain in the
    /// living count until the end of the curve.
    ///
    /// # Panics
    ///
    /// Panics if there are more death times than `initial_size`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survcal_stats::survival::SurvivalCurve;
    /// let curve = SurvivalCurve::from_death_times(5, &[3, 1, 3]);
    /// assert_eq!(curve.times, vec![1, 3]);
    /// assert_eq!(curve.events, vec![1, 2]);
    /// assert_eq!(curve.alive, vec![4, 2]);
    /// ```
    #[must_use]
    pub fn from_death_times(initial_size: usize, death_times: &[usize]) -> Self {
        assert!(
            death_times.len() <= initial_size,
            "more deaths ({}) than individuals ({initial_size})",
            death_times.len()
        );

        let mut sorted = death_times.to_vec();
        sorted.sort_unstable();

        let mut times = vec![];
        let mut events = vec![];
        let mut alive = vec![];
        let mut remaining = initial_size;

        for chunk in sorted.chunk_by(|a, b| a == b) {
            remaining -= chunk.len();
            times.push(chunk[0]);
            events.push(chunk.len());
            alive.push(remaining);
        }

        Self {
            initial_size,
            times,
            events,
            alive,
        }
    }

    /// Returns the number of individuals alive at the end of `time`.
    ///
    /// ```
    /// # use survcal_stats::survival::SurvivalCurve;
    /// let curve = SurvivalCurve::from_death_times(3, &[2, 4]);
    /// assert_eq!(curve.alive_at(1), 3);
    /// assert_eq!(curve.alive_at(2), 2);
    /// assert_eq!(curve.alive_at(3), 2);
    /// assert_eq!(curve.alive_at(100), 1);
    /// ```
    #[must_use]
    pub fn alive_at(&self, time: usize) -> usize {
        let idx = self.times.partition_point(|t| *t <= time);
        match idx {
            0 => self.initial_size,
            i => self.alive[i - 1],
        }
    }

    /// Returns an iterator over `(time, alive)` points, starting with
    /// `(0, initial_size)`.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        std::iter::once((0, self.initial_size))
            .chain(self.times.iter().copied().zip(self.alive.iter().copied()))
    }
}
