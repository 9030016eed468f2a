use crate::{
    descriptive::DescriptiveStats, distribution::student_t_quantile,
    percentiles::compute_percentile,
};

/// Named summary of a set of observations.
///
/// This is the summary-statistics service used across the workspace: it
/// reports the mean, a percentile interval, and a t-distribution confidence
/// interval for the mean at a given significance level.
///
/// # Examples
///
/// ```
/// use survcal_stats::summary::SummaryStat;
///
/// let stat = SummaryStat::new("Mean survival time", (1..=101).map(f64::from)).unwrap();
/// assert_eq!(stat.mean(), 51.0);
///
/// let (lower, upper) = stat.percentile_interval(0.05);
/// assert!((lower - 3.5).abs() < 1e-9);
/// assert!((upper - 98.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct SummaryStat {
    name: String,
    sorted: Vec<f64>,
    stats: DescriptiveStats,
}

impl SummaryStat {
    /// Summarizes `values` under the given `name`.
    ///
    /// Returns `None` if there are no observations.
    #[must_use]
    pub fn new<S, I>(name: S, values: I) -> Option<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = f64>,
    {
        let mut sorted = values.into_iter().collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);
        let stats = DescriptiveStats::from_sorted(&sorted)?;
        Some(Self {
            name: name.into(),
            sorted,
            stats,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of observations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.stats.count
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.stats.mean
    }

    #[must_use]
    pub fn descriptive(&self) -> &DescriptiveStats {
        &self.stats
    }

    /// Percentile interval `(P[α/2], P[1 - α/2])` of the observations.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the open interval `(0, 1)`.
    #[must_use]
    pub fn percentile_interval(&self, alpha: f64) -> (f64, f64) {
        assert_significance_level(alpha);
        (
            compute_percentile(&self.sorted, 100.0 * alpha / 2.0),
            compute_percentile(&self.sorted, 100.0 * (1.0 - alpha / 2.0)),
        )
    }

    /// Confidence interval for the mean based on Student's t distribution.
    ///
    /// Returns `None` with fewer than two observations.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the open interval `(0, 1)`.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn t_confidence_interval(&self, alpha: f64) -> Option<(f64, f64)> {
        assert_significance_level(alpha);
        let n = self.stats.count;
        if n < 2 {
            return None;
        }
        let t = student_t_quantile(1.0 - alpha / 2.0, n - 1);
        let half_width = t * self.stats.std_dev / (n as f64).sqrt();
        Some((self.stats.mean - half_width, self.stats.mean + half_width))
    }
}

fn assert_significance_level(alpha: f64) {
    assert!(
        alpha > 0.0 && alpha < 1.0,
        "significance level must be in (0, 1), got {alpha}"
    );
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_empty_observations() {
        assert!(SummaryStat::new("empty", []).is_none());
    }

    #[test]
    fn test_name_and_count() {
        let stat = SummaryStat::new("Posterior samples", [0.1, 0.2, 0.3]).unwrap();
        assert_eq!(stat.name(), "Posterior samples");
        assert_eq!(stat.count(), 3);
    }

    #[test]
    fn test_percentile_interval_brackets_mean() {
        let stat = SummaryStat::new("x", [5.0, 1.0, 9.0, 3.0, 7.0]).unwrap();
        let (lo, hi) = stat.percentile_interval(0.05);
        assert!(lo <= stat.mean() && stat.mean() <= hi);
        assert_abs_diff_eq!(lo, 1.2, epsilon = 1e-12);
        assert_abs_diff_eq!(hi, 8.8, epsilon = 1e-12);
    }

    #[test]
    fn test_t_confidence_interval() {
        // mean 5, sample sd sqrt(10) = 3.1623, n = 5, t(0.975, 4) = 2.776
        let stat = SummaryStat::new("x", [1.0, 3.0, 5.0, 7.0, 9.0]).unwrap();
        let (lo, hi) = stat.t_confidence_interval(0.05).unwrap();
        assert_abs_diff_eq!(lo, 5.0 - 3.926, epsilon = 0.02);
        assert_abs_diff_eq!(hi, 5.0 + 3.926, epsilon = 0.02);
    }

    #[test]
    fn test_t_confidence_interval_needs_two_observations() {
        let stat = SummaryStat::new("x", [1.0]).unwrap();
        assert!(stat.t_confidence_interval(0.05).is_none());
    }

    #[test]
    #[should_panic(expected = "significance level")]
    fn test_invalid_alpha() {
        let stat = SummaryStat::new("x", [1.0, 2.0]).unwrap();
        let _ = stat.percentile_interval(1.5);
    }
}
