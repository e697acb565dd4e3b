// Descriptive statistics for baseline windows
//
// The baseline center is the median rather than the mean: one noisy CI run
// in the window must not drag the reference point.

/// Median of a set of values, `None` when empty
///
/// Even-length inputs average the two middle values. NaNs sort last via
/// `total_cmp`, though parsed samples never contain them.
///
/// # Example
/// ```
/// use benchtrack::regression::median;
///
/// assert_eq!(median(&[100.0, 102.0, 98.0]), Some(100.0));
/// assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
/// assert_eq!(median(&[]), None);
/// ```
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Coefficient of variation (population stddev / |mean|)
///
/// Returns 0.0 for empty input or a mean near zero. Used for display only,
/// never in the verdict.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let Some(mean) = mean(values) else {
        return 0.0;
    };
    if mean.abs() < 1e-12 {
        return 0.0;
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt() / mean.abs()
}
