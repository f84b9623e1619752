//! Descriptive statistics shared by the detectors and the risk scorer.

/// Population mean and standard deviation. `None` for an empty slice.
pub fn mean_std(vals: &[f64]) -> Option<(f64, f64)> {
    if vals.is_empty() {
        return None;
    }
    let n = vals.len() as f64;
    let mean = vals.iter().sum::<f64>() / n;
    let sq_diff: f64 = vals.iter().map(|v| (v - mean).powi(2)).sum();
    Some((mean, (sq_diff / n).sqrt()))
}

/// Finite values sorted ascending.
pub fn sorted_finite(vals: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = vals.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// `p`-th quantile of pre-sorted data, linear interpolation between closest ranks.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let pos = (n - 1) as f64 * p;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => Some(sorted[base] + rest * (next - sorted[base])),
        None => Some(sorted[base]),
    }
}

/// First and third quartiles.
pub fn quartiles(vals: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted_finite(vals);
    Some((quantile_sorted(&sorted, 0.25)?, quantile_sorted(&sorted, 0.75)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
        assert!(mean_std(&[]).is_none());
    }

    #[test]
    fn test_quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert!((quantile_sorted(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(quantile_sorted(&[], 0.5), None);
        assert_eq!(quantile_sorted(&sorted, 1.5), None);
    }

    #[test]
    fn test_quartiles_unsorted_input() {
        let (q1, q3) = quartiles(&[1000.0, 10.0, 10.0, 10.0, 10.0]).unwrap();
        assert_eq!(q1, 10.0);
        assert_eq!(q3, 10.0);
    }
}
