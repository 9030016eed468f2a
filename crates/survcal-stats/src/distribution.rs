//! Probability mass and quantile functions used by calibration and interval
//! estimation.
//!
//! - [`binomial_pmf`]: likelihood of an observed survivor count
//! - [`normal_quantile`] and [`student_t_quantile`]: critical values for
//!   confidence intervals
//!
//! All functions work in `f64` and avoid producing `NaN` for valid inputs:
//! probabilities too small to represent underflow to `0.0`.

use std::f64::consts::PI;

/// Natural logarithm of the gamma function for `x > 0`.
///
/// Shifts `x` upward with the recurrence `Γ(x + 1) = x Γ(x)` until the
/// Stirling series is accurate to machine precision, then applies it with
/// four Bernoulli terms.
/// Returns `f64::INFINITY` for `x <= 0`.
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x <= 0.0 {
        return f64::INFINITY;
    }

    let mut x = x;
    let mut result = 0.0;
    while x < 30.0 {
        result -= x.ln();
        x += 1.0;
    }

    let inv_x = 1.0 / x;
    let inv_x2 = inv_x * inv_x;
    let correction =
        inv_x * (1.0 / 12.0 - inv_x2 * (1.0 / 360.0 - inv_x2 * (1.0 / 1260.0 - inv_x2 / 1680.0)));

    result + (x - 0.5) * x.ln() - x + 0.5 * (2.0 * PI).ln() + correction
}

/// Natural logarithm of the binomial coefficient `C(n, k)`.
///
/// Returns `f64::NEG_INFINITY` when `k > n`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn ln_binomial_coefficient(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    let (n, k) = (n as f64, k as f64);
    ln_gamma(n + 1.0) - ln_gamma(k + 1.0) - ln_gamma(n - k + 1.0)
}

/// Binomial probability mass `P(X = k | n, p)`.
///
/// The boundary probabilities `p = 0` and `p = 1` are handled exactly.
/// Masses below the smallest representable `f64` come back as `0.0`.
///
/// # Panics
///
/// Panics in debug builds if `p` is outside `[0, 1]`.
///
/// # Examples
///
/// ```
/// use survcal_stats::distribution::binomial_pmf;
///
/// let pmf = binomial_pmf(2, 4, 0.5);
/// assert!((pmf - 0.375).abs() < 1e-12);
///
/// assert_eq!(binomial_pmf(0, 10, 0.0), 1.0);
/// assert_eq!(binomial_pmf(11, 10, 0.5), 0.0);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    debug_assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln_pmf = ln_binomial_coefficient(n, k)
        + k as f64 * p.ln()
        + (n - k) as f64 * (-p).ln_1p();
    ln_pmf.exp()
}

/// Quantile of the standard normal distribution.
///
/// Abramowitz & Stegun 26.2.23 rational approximation (absolute error below
/// `4.5e-4`). Returns the infinities at `p <= 0` and `p >= 1`.
#[must_use]
pub fn normal_quantile(p: f64) -> f64 {
    const C0: f64 = 2.515_517;
    const C1: f64 = 0.802_853;
    const C2: f64 = 0.010_328;
    const D1: f64 = 1.432_788;
    const D2: f64 = 0.189_269;
    const D3: f64 = 0.001_308;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if (p - 0.5).abs() < 1e-15 {
        return 0.0;
    }

    let (sign, pp) = if p < 0.5 { (-1.0, p) } else { (1.0, 1.0 - p) };
    let t = (-2.0 * pp.ln()).sqrt();
    let numerator = C2.mul_add(t, C1).mul_add(t, C0);
    let denominator = D3.mul_add(t, D2).mul_add(t, D1).mul_add(t, 1.0);
    sign * (t - numerator / denominator)
}

/// Quantile of Student's t distribution with `df` degrees of freedom.
///
/// Exact closed forms for one and two degrees of freedom; otherwise the
/// Cornish-Fisher expansion around the normal quantile (A&S 26.7.5).
///
/// # Panics
///
/// Panics if `df == 0`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn student_t_quantile(p: f64, df: usize) -> f64 {
    assert!(df > 0, "degrees of freedom must be positive");
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    match df {
        1 => (PI * (p - 0.5)).tan(),
        2 => (2.0 * p - 1.0) / (2.0 * p * (1.0 - p)).sqrt(),
        _ => {
            let x = normal_quantile(p);
            let nu = df as f64;
            let x2 = x * x;
            let x3 = x2 * x;
            let x5 = x3 * x2;
            let x7 = x5 * x2;
            let x9 = x7 * x2;
            let g1 = (x3 + x) / 4.0;
            let g2 = (5.0 * x5 + 16.0 * x3 + 3.0 * x) / 96.0;
            let g3 = (3.0 * x7 + 19.0 * x5 + 17.0 * x3 - 15.0 * x) / 384.0;
            let g4 = (79.0 * x9 + 776.0 * x7 + 1482.0 * x5 - 1920.0 * x3 - 945.0 * x) / 92160.0;
            x + g1 / nu + g2 / nu.powi(2) + g3 / nu.powi(3) + g4 / nu.powi(4)
        }
    }
}
