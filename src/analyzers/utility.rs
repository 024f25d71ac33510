/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input or when every value is identical.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() || values.iter().all(|v| *v == values[0]) {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Rounds to one decimal place (half away from zero).
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rounds to two decimal places (half away from zero).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn test_stddev_is_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let m = mean(&values);
        assert_eq!(m, 5.0);
        assert_eq!(stddev(&values, m), 2.0);
    }

    #[test]
    fn test_stddev_constant_series_is_exactly_zero() {
        let values = [0.1, 0.1, 0.1];
        assert_eq!(stddev(&values, mean(&values)), 0.0);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round1(54.96), 55.0);
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(round2(1.3399), 1.34);
    }
}
