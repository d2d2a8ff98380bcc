//! Small order-statistic helpers shared by normalization and partitioning.

/// Linear-interpolated quantile of an ascending slice, `q` in [0, 1].
///
/// Uses the `(n - 1) * q` position convention, so `q = 0` is the minimum and
/// `q = 1` the maximum.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Copy and sort finite values ascending.
pub(crate) fn sorted_finite(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Mean and population standard deviation of finite values.
pub(crate) fn mean_std(values: &[f32]) -> (f64, f64) {
    let mut count = 0usize;
    let mut sum = 0.0f64;
    for &v in values.iter().filter(|v| v.is_finite()) {
        sum += v as f64;
        count += 1;
    }
    if count == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / count as f64;
    let var = values
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / count as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_matches_linear_convention() {
        let sorted: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        assert!((quantile_sorted(&sorted, 0.8) - 8.2).abs() < 1e-9);
        assert!((quantile_sorted(&sorted, 0.2) - 2.8).abs() < 1e-9);
        assert_eq!(quantile_sorted(&sorted, 0.0), 1.0);
        assert_eq!(quantile_sorted(&sorted, 1.0), 10.0);
    }

    #[test]
    fn test_quantile_single_value() {
        assert_eq!(quantile_sorted(&[3.5], 0.3), 3.5);
        assert!(quantile_sorted(&[], 0.5).is_nan());
    }

    #[test]
    fn test_mean_std_skips_nan() {
        let (mean, std) = mean_std(&[1.0, f32::NAN, 3.0]);
        assert!((mean - 2.0).abs() < 1e-12);
        assert!((std - 1.0).abs() < 1e-12);
    }
}
