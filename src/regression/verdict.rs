// Per-benchmark comparison of a new sample against its baseline window
//
// The comparator is pure: it sees one new sample, the matching samples from
// the baseline window and a ComparatorConfig, and returns a verdict. It never
// touches the history store.

use crate::model::BenchmarkSample;
use crate::regression::config::{ComparatorConfig, Direction};
use crate::regression::statistics::median;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A benchmark reported a different unit than its baseline
///
/// Comparing `ns/iter` against `ms/iter` would give a confidently wrong
/// answer, so this is surfaced for human review instead.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("benchmark '{name}' changed unit from '{expected}' to '{found}'")]
pub struct UnitMismatchError {
    pub name: String,
    pub expected: String,
    pub found: String,
}

/// Outcome of comparing one benchmark against its baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Change within the alert threshold
    Stable,
    /// Worse than baseline beyond the alert threshold
    Regression,
    /// Better than baseline beyond the alert threshold
    Improvement,
    /// Deviation within the sample's own reported uncertainty
    Noise,
    /// Not enough baseline samples to judge
    InsufficientData,
    /// Unit changed; comparison refused
    UnitMismatch { expected: String, found: String },
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Regression => "regression",
            Self::Improvement => "improvement",
            Self::Noise => "noise",
            Self::InsufficientData => "insufficient data",
            Self::UnitMismatch { .. } => "unit mismatch",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a change was measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeBasis {
    /// Fraction of the baseline center
    Relative,
    /// Plain difference in the sample's unit (baseline center was zero)
    Absolute,
}

/// Direction-adjusted change: positive always means "got worse"
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Change {
    pub amount: f64,
    pub basis: ChangeBasis,
}

impl Change {
    /// Human-readable form, e.g. `10.00% worse` or `0.50 better`
    pub fn describe(&self) -> String {
        let magnitude = self.amount.abs();
        let trend = if self.amount > 0.0 {
            " worse"
        } else if self.amount < 0.0 {
            " better"
        } else {
            ""
        };
        match self.basis {
            ChangeBasis::Relative => format!("{:.2}%{}", magnitude * 100.0, trend),
            ChangeBasis::Absolute => format!("{magnitude:.4}{trend}"),
        }
    }
}

/// Result of [`compare`]
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub verdict: Verdict,
    /// `None` when no verdict could be computed
    pub change: Option<Change>,
    /// Median of the baseline values, when any exist
    pub baseline_center: Option<f64>,
    pub baseline_size: usize,
}

/// Compare a new sample against the same benchmark's baseline samples
///
/// 1. Any baseline sample with a different unit is a [`UnitMismatchError`].
/// 2. Fewer than `min_baseline_size` samples gives `InsufficientData`.
/// 3. The baseline center is the median; the change is relative to it and
///    sign-adjusted so that positive means worse.
/// 4. A change within the new sample's `range` is `Noise`, whatever the
///    threshold.
/// 5. Otherwise the alert threshold separates `Regression`, `Improvement`
///    and `Stable`.
///
/// A zero baseline center makes relative change undefined; the change is
/// then the absolute difference and the threshold is read as an absolute
/// delta.
///
/// # Example
/// ```
/// use benchtrack::model::{BenchmarkSample, Range};
/// use benchtrack::regression::{compare, ComparatorConfig, Direction, Verdict};
///
/// let baseline: Vec<_> = [100.0, 102.0, 98.0]
///     .iter()
///     .map(|v| BenchmarkSample::new("parse", *v, "iter/sec"))
///     .collect();
/// let refs: Vec<_> = baseline.iter().collect();
/// let new = BenchmarkSample::new("parse", 90.0, "iter/sec").with_range(Range::new(2.0).unwrap());
///
/// let config = ComparatorConfig {
///     alert_threshold: 0.05,
///     direction: Direction::HigherIsBetter,
///     min_baseline_size: 3,
/// };
/// let result = compare(&new, &refs, &config).unwrap();
/// assert_eq!(result.verdict, Verdict::Regression);
/// assert!((result.change.unwrap().amount - 0.10).abs() < 1e-12);
/// ```
pub fn compare(
    new_sample: &BenchmarkSample,
    baseline_samples: &[&BenchmarkSample],
    config: &ComparatorConfig,
) -> Result<Comparison, UnitMismatchError> {
    if let Some(other) = baseline_samples
        .iter()
        .find(|s| s.unit.trim() != new_sample.unit.trim())
    {
        return Err(UnitMismatchError {
            name: new_sample.name.clone(),
            expected: other.unit.trim().to_string(),
            found: new_sample.unit.trim().to_string(),
        });
    }

    let values: Vec<f64> = baseline_samples.iter().map(|s| s.value).collect();
    let baseline_center = median(&values);
    let insufficient = Comparison {
        verdict: Verdict::InsufficientData,
        change: None,
        baseline_center,
        baseline_size: values.len(),
    };

    if values.len() < config.min_baseline_size {
        return Ok(insufficient);
    }
    let Some(center) = baseline_center else {
        return Ok(insufficient);
    };

    let delta = new_sample.value - center;
    let (raw_change, basis) = if center == 0.0 {
        (delta, ChangeBasis::Absolute)
    } else {
        (delta / center.abs(), ChangeBasis::Relative)
    };

    let amount = match config.direction {
        Direction::HigherIsBetter => -raw_change,
        Direction::LowerIsBetter => raw_change,
    };
    // no negative zero in reports
    let amount = if amount == 0.0 { 0.0 } else { amount };

    // Compared in the value's own unit, with one rounding step of slack so
    // a value computed as center ± range still lands inside the band.
    let slack = f64::EPSILON * (center.abs() + new_sample.value.abs());
    let verdict = if delta.abs() <= new_sample.range_value() + slack {
        Verdict::Noise
    } else if amount > config.alert_threshold {
        Verdict::Regression
    } else if amount < -config.alert_threshold {
        Verdict::Improvement
    } else {
        Verdict::Stable
    };

    Ok(Comparison {
        verdict,
        change: Some(Change { amount, basis }),
        baseline_center: Some(center),
        baseline_size: values.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Range;

    fn samples(values: &[f64], unit: &str) -> Vec<BenchmarkSample> {
        values
            .iter()
            .map(|v| BenchmarkSample::new("bench", *v, unit))
            .collect()
    }

    fn config(direction: Direction) -> ComparatorConfig {
        ComparatorConfig {
            alert_threshold: 0.05,
            direction,
            min_baseline_size: 3,
        }
    }

    fn run(new: BenchmarkSample, baseline: &[BenchmarkSample], direction: Direction) -> Comparison {
        let refs: Vec<_> = baseline.iter().collect();
        compare(&new, &refs, &config(direction)).unwrap()
    }

    #[test]
    fn test_regression_higher_is_better() {
        let baseline = samples(&[100.0, 102.0, 98.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 90.0, "iter/sec").with_range(Range::new(2.0).unwrap());
        let result = run(new, &baseline, Direction::HigherIsBetter);

        assert_eq!(result.verdict, Verdict::Regression);
        assert_eq!(result.baseline_center, Some(100.0));
        assert!((result.change.unwrap().amount - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_noise_within_range() {
        let baseline = samples(&[100.0, 102.0, 98.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 99.0, "iter/sec").with_range(Range::new(3.0).unwrap());
        assert_eq!(run(new, &baseline, Direction::HigherIsBetter).verdict, Verdict::Noise);
    }

    #[test]
    fn test_value_at_range_edge_is_noise() {
        // 0.4 - 0.1 is 0.30000000000000004 in binary, just past 0.3
        let baseline = samples(&[0.1, 0.1, 0.1], "ops");
        for direction in [Direction::HigherIsBetter, Direction::LowerIsBetter] {
            let up = BenchmarkSample::new("bench", 0.4, "ops").with_range(Range::new(0.3).unwrap());
            assert_eq!(run(up, &baseline, direction).verdict, Verdict::Noise);
        }

        let baseline = samples(&[1000.0, 1000.0, 1000.0], "ops");
        let down = BenchmarkSample::new("bench", 1000.0 - 0.7, "ops").with_range(Range::new(0.7).unwrap());
        assert_eq!(run(down, &baseline, Direction::HigherIsBetter).verdict, Verdict::Noise);
    }

    #[test]
    fn test_just_outside_range_is_not_noise() {
        let baseline = samples(&[100.0, 100.0, 100.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 89.9, "iter/sec").with_range(Range::new(10.0).unwrap());
        assert_eq!(run(new, &baseline, Direction::HigherIsBetter).verdict, Verdict::Regression);
    }

    #[test]
    fn test_noise_beats_threshold() {
        // 20% drop, but the sample itself reports +/- 25
        let baseline = samples(&[100.0, 100.0, 100.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 80.0, "iter/sec").with_range(Range::new(25.0).unwrap());
        assert_eq!(run(new, &baseline, Direction::HigherIsBetter).verdict, Verdict::Noise);
    }

    #[test]
    fn test_improvement_lower_is_better() {
        let baseline = samples(&[200.0, 210.0, 190.0], "ns/iter");
        let new = BenchmarkSample::new("bench", 150.0, "ns/iter");
        let result = run(new, &baseline, Direction::LowerIsBetter);
        assert_eq!(result.verdict, Verdict::Improvement);
        assert!(result.change.unwrap().amount < 0.0);
    }

    #[test]
    fn test_regression_lower_is_better() {
        let baseline = samples(&[200.0, 210.0, 190.0], "ns/iter");
        let new = BenchmarkSample::new("bench", 230.0, "ns/iter");
        assert_eq!(
            run(new, &baseline, Direction::LowerIsBetter).verdict,
            Verdict::Regression
        );
    }

    #[test]
    fn test_stable_within_threshold() {
        let baseline = samples(&[100.0, 100.0, 100.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 97.0, "iter/sec");
        assert_eq!(
            run(new, &baseline, Direction::HigherIsBetter).verdict,
            Verdict::Stable
        );
    }

    #[test]
    fn test_insufficient_data() {
        let baseline = samples(&[100.0, 100.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 10.0, "iter/sec");
        let result = run(new, &baseline, Direction::HigherIsBetter);
        assert_eq!(result.verdict, Verdict::InsufficientData);
        assert_eq!(result.change, None);
        assert_eq!(result.baseline_size, 2);
    }

    #[test]
    fn test_empty_baseline_is_insufficient() {
        let new = BenchmarkSample::new("bench", 10.0, "iter/sec");
        let result = run(new, &[], Direction::HigherIsBetter);
        assert_eq!(result.verdict, Verdict::InsufficientData);
        assert_eq!(result.baseline_center, None);
    }

    #[test]
    fn test_unit_mismatch() {
        let baseline = samples(&[100.0, 100.0, 100.0], "ns/iter");
        let refs: Vec<_> = baseline.iter().collect();
        let new = BenchmarkSample::new("bench", 0.1, "us/iter");
        let err = compare(&new, &refs, &config(Direction::LowerIsBetter)).unwrap_err();
        assert_eq!(err.expected, "ns/iter");
        assert_eq!(err.found, "us/iter");
    }

    #[test]
    fn test_unit_compared_after_trim() {
        let baseline = samples(&[100.0, 100.0, 100.0], " ns/iter");
        let refs: Vec<_> = baseline.iter().collect();
        let new = BenchmarkSample::new("bench", 100.0, "ns/iter");
        assert!(compare(&new, &refs, &config(Direction::LowerIsBetter)).is_ok());
    }

    #[test]
    fn test_zero_center_falls_back_to_absolute() {
        let baseline = samples(&[0.0, 0.0, 0.0], "errors");
        let new = BenchmarkSample::new("bench", 1.0, "errors");
        let result = run(new, &baseline, Direction::LowerIsBetter);
        let change = result.change.unwrap();
        assert_eq!(change.basis, ChangeBasis::Absolute);
        assert_eq!(change.amount, 1.0);
        assert_eq!(result.verdict, Verdict::Regression);
    }

    #[test]
    fn test_zero_center_small_absolute_delta_is_stable() {
        let baseline = samples(&[0.0, 0.0, 0.0], "errors");
        let new = BenchmarkSample::new("bench", 0.01, "errors");
        assert_eq!(
            run(new, &baseline, Direction::LowerIsBetter).verdict,
            Verdict::Stable
        );
    }

    #[test]
    fn test_exact_match_without_range_is_noise() {
        let baseline = samples(&[100.0, 100.0, 100.0], "iter/sec");
        let new = BenchmarkSample::new("bench", 100.0, "iter/sec");
        assert_eq!(
            run(new, &baseline, Direction::HigherIsBetter).verdict,
            Verdict::Noise
        );
    }

    #[test]
    fn test_change_describe() {
        let worse = Change {
            amount: 0.1,
            basis: ChangeBasis::Relative,
        };
        assert_eq!(worse.describe(), "10.00% worse");
        let better = Change {
            amount: -0.5,
            basis: ChangeBasis::Absolute,
        };
        assert_eq!(better.describe(), "0.5000 better");
    }
}
