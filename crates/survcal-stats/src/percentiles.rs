/// Computes a single percentile value from sorted data.
///
/// Uses linear interpolation between the two closest order statistics:
/// the `k`-th percentile sits at fractional rank `(n - 1) * k / 100`.
/// Percentiles outside `[0, 100]` are clamped.
///
/// Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use survcal_stats::percentiles::compute_percentile;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0];
///
/// assert_eq!(compute_percentile(&values, 0.0), 1.0);
/// assert_eq!(compute_percentile(&values, 50.0), 2.5);
/// assert_eq!(compute_percentile(&values, 100.0), 4.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    let Some(&last) = sorted_values.last() else {
        return f64::NAN;
    };
    let percentile = percentile.clamp(0.0, 100.0);
    let rank = (sorted_values.len() - 1) as f64 * percentile / 100.0;
    let lower = rank.floor() as usize;
    if lower + 1 >= sorted_values.len() {
        return last;
    }
    let frac = rank - lower as f64;
    let (a, b) = (sorted_values[lower], sorted_values[lower + 1]);
    a + (b - a) * frac
}
