/// Formats a point estimate with its interval as `"estimate (lower, upper)"`.
///
/// # Examples
///
/// ```
/// use survcal_stats::format::format_estimate_interval;
///
/// let text = format_estimate_interval(0.0712, (0.0651, 0.0779), 3);
/// assert_eq!(text, "0.071 (0.065, 0.078)");
/// ```
#[must_use]
pub fn format_estimate_interval(estimate: f64, interval: (f64, f64), decimals: usize) -> String {
    let (lower, upper) = interval;
    format!("{estimate:.decimals$} ({lower:.decimals$}, {upper:.decimals$})")
}

/// Formats a proportion as a percentage with the given number of decimals.
///
/// ```
/// use survcal_stats::format::format_percentage;
///
/// assert_eq!(format_percentage(0.95, 0), "95%");
/// ```
#[must_use]
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_decimals() {
        assert_eq!(format_estimate_interval(17.6, (16.2, 19.04), 0), "18 (16, 19)");
    }

    #[test]
    fn test_negative_bounds() {
        assert_eq!(
            format_estimate_interval(-0.5, (-1.25, 0.25), 2),
            "-0.50 (-1.25, 0.25)"
        );
    }
}
