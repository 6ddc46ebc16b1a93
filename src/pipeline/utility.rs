/// Divides `numerator` by `denominator`, returning `fallback` when the
/// denominator is zero or the quotient is not finite.
///
/// Both the feature table and the scenario builder go through this one
/// function so their division policy cannot diverge.
pub fn safe_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator == 0.0 {
        return fallback;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() { ratio } else { fallback }
}

/// Replaces NaN and ±∞ with zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Linear-interpolated quantile of an ascending slice, `q` in `[0, 1]`.
/// Returns 0.0 for empty input.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = pos.floor() as usize;
            let upper = pos.ceil() as usize;
            let frac = pos - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_ratio_zero_denominator() {
        assert_eq!(safe_ratio(10.0, 0.0, 0.0), 0.0);
        assert_eq!(safe_ratio(10.0, -0.0, 0.0), 0.0);
        assert_eq!(safe_ratio(10.0, 4.0, 0.0), 2.5);
    }

    #[test]
    fn test_safe_ratio_non_finite_operands() {
        assert_eq!(safe_ratio(f64::NAN, 2.0, 0.0), 0.0);
        assert_eq!(safe_ratio(f64::INFINITY, 2.0, 0.0), 0.0);
        assert_eq!(safe_ratio(1.0, f64::NAN, 0.0), 0.0);
        assert_eq!(safe_ratio(f64::MAX, f64::MIN_POSITIVE, 0.0), 0.0);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), 3.0);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&values, 0.0), 1.0);
        assert_eq!(quantile(&values, 1.0), 4.0);
        assert!((quantile(&values, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&values, 0.25) - 1.75).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }
}
