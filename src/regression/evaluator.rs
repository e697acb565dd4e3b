// Suite-level roll-up of per-benchmark verdicts
//
// Runs the comparator for every sample of the newest entry in a suite and
// folds the results into pass / warn / fail. Per-benchmark problems (unit
// changes, short history) stay inside the report; only a missing or empty
// suite aborts evaluation.

use crate::history::{baseline_window, Anchor, History, HistoryError};
use crate::model::{BenchmarkEntry, BenchmarkSample, Commit, Range};
use crate::regression::config::{Direction, RegressionConfig};
use crate::regression::statistics::coefficient_of_variation;
use crate::regression::verdict::{compare, Change, Verdict};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Suite-level decision, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Pass,
    Warn,
    Fail,
}

impl Overall {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one benchmark of the newest entry
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub range: Option<f64>,
    pub verdict: Verdict,
    pub change: Option<Change>,
    pub baseline_center: Option<f64>,
    pub baseline_size: usize,
    /// Spread of the baseline values, for display
    pub baseline_cv: f64,
    /// Whether any earlier entry of the suite measured this benchmark
    pub previously_tracked: bool,
    /// What this benchmark alone contributes to the suite decision
    pub severity: Overall,
}

/// A benchmark present in the baseline window but not in the newest entry
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedBenchmark {
    pub name: String,
    pub unit: String,
    pub last_value: f64,
    /// Commit of the last entry that measured it
    pub last_seen: Commit,
}

/// Outcome of [`evaluate`]
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    pub suite: String,
    pub commit: Commit,
    pub date: u64,
    pub tool: String,
    pub direction: Direction,
    /// Commit of the entry immediately before the newest, if any
    pub previous_commit: Option<Commit>,
    pub alert_threshold: f64,
    pub hard_threshold: f64,
    /// In the newest entry's sample order
    pub benchmarks: Vec<BenchmarkReport>,
    /// Sorted by name
    pub removed: Vec<RemovedBenchmark>,
    pub overall: Overall,
}

impl SuiteReport {
    pub fn get(&self, name: &str) -> Option<&BenchmarkReport> {
        self.benchmarks.iter().find(|b| b.name == name)
    }

    /// Benchmarks with the given verdict kind
    pub fn with_verdict<'a>(
        &'a self,
        matches: impl Fn(&Verdict) -> bool + 'a,
    ) -> impl Iterator<Item = &'a BenchmarkReport> + 'a {
        self.benchmarks.iter().filter(move |b| matches(&b.verdict))
    }

    /// Count of benchmarks per verdict label
    pub fn verdict_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for benchmark in &self.benchmarks {
            *counts.entry(benchmark.verdict.label()).or_insert(0) += 1;
        }
        counts
    }
}

/// Evaluate the newest entry of `suite` against its baseline window
///
/// Roll-up:
/// - `fail` when any regression exceeds the hard threshold, or a benchmark
///   changed unit;
/// - `warn` when any regression stays below the hard threshold, a
///   previously tracked benchmark lacks enough baseline, or (when
///   configured) a benchmark disappeared;
/// - `pass` otherwise. A brand-new benchmark never raises the suite above
///   `pass` on its own.
pub fn evaluate(
    history: &History,
    suite: &str,
    config: &RegressionConfig,
) -> Result<SuiteReport, HistoryError> {
    let entries = history
        .suite(suite)
        .ok_or_else(|| HistoryError::UnknownSuite(suite.to_string()))?;
    let (latest, prior) = entries
        .split_last()
        .ok_or_else(|| HistoryError::EmptySuite(suite.to_string()))?;

    let window = baseline_window(history, suite, Anchor::Latest, config.window_size);
    let comparator = config.comparator_for(&latest.tool);
    let hard = config.hard_alert_threshold();

    let benchmarks: Vec<BenchmarkReport> = latest
        .benches
        .iter()
        .map(|sample| {
            let baseline: Vec<_> = window.iter().filter_map(|e| e.sample(&sample.name)).collect();
            let previously_tracked = prior.iter().any(|e| e.contains(&sample.name));
            let values: Vec<f64> = baseline.iter().map(|s| s.value).collect();

            let range = sample.range_in_value_units(&latest.tool);
            let measured = if range == sample.range.as_ref().map(Range::value) {
                Cow::Borrowed(sample)
            } else {
                Cow::Owned(BenchmarkSample {
                    range: range.and_then(Range::new),
                    ..sample.clone()
                })
            };

            let (verdict, change, baseline_center) = match compare(&measured, &baseline, &comparator)
            {
                Ok(comparison) => (
                    comparison.verdict,
                    comparison.change,
                    comparison.baseline_center,
                ),
                Err(mismatch) => {
                    tracing::warn!(%mismatch, "unit mismatch");
                    (
                        Verdict::UnitMismatch {
                            expected: mismatch.expected,
                            found: mismatch.found,
                        },
                        None,
                        None,
                    )
                }
            };

            let severity = severity_of(&verdict, change.as_ref(), previously_tracked, hard);
            tracing::debug!(
                benchmark = %sample.name,
                verdict = verdict.label(),
                baseline = values.len(),
                severity = severity.as_str(),
                "compared"
            );

            BenchmarkReport {
                name: sample.name.clone(),
                unit: sample.unit.clone(),
                value: sample.value,
                range,
                verdict,
                change,
                baseline_center,
                baseline_size: values.len(),
                baseline_cv: coefficient_of_variation(&values),
                previously_tracked,
                severity,
            }
        })
        .collect();

    let removed = removed_benchmarks(window, latest);

    let mut overall = benchmarks
        .iter()
        .map(|b| b.severity)
        .max()
        .unwrap_or(Overall::Pass);
    if config.removed_is_warning && !removed.is_empty() {
        overall = overall.max(Overall::Warn);
    }

    Ok(SuiteReport {
        suite: suite.to_string(),
        commit: latest.commit.clone(),
        date: latest.date,
        tool: latest.tool.clone(),
        direction: comparator.direction,
        previous_commit: prior.last().map(|e| e.commit.clone()),
        alert_threshold: config.alert_threshold(),
        hard_threshold: hard,
        benchmarks,
        removed,
        overall,
    })
}

fn severity_of(
    verdict: &Verdict,
    change: Option<&Change>,
    previously_tracked: bool,
    hard_threshold: f64,
) -> Overall {
    match verdict {
        Verdict::Regression => match change {
            Some(change) if change.amount > hard_threshold => Overall::Fail,
            _ => Overall::Warn,
        },
        Verdict::UnitMismatch { .. } => Overall::Fail,
        Verdict::InsufficientData if previously_tracked => Overall::Warn,
        _ => Overall::Pass,
    }
}

fn removed_benchmarks(window: &[BenchmarkEntry], latest: &BenchmarkEntry) -> Vec<RemovedBenchmark> {
    let mut removed: BTreeMap<&str, RemovedBenchmark> = BTreeMap::new();
    // Later entries overwrite earlier ones, leaving the last sighting
    for entry in window {
        for sample in entry.benches.iter().filter(|s| !latest.contains(&s.name)) {
            removed.insert(
                &sample.name,
                RemovedBenchmark {
                    name: sample.name.clone(),
                    unit: sample.unit.clone(),
                    last_value: sample.value,
                    last_seen: entry.commit.clone(),
                },
            );
        }
    }
    removed.into_values().collect()
}
