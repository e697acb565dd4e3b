//! JSON output format for suite reports
//!
//! Machine-readable counterpart of the text table, for dashboards and
//! follow-up CI steps.

use crate::model::Commit;
use crate::regression::{ChangeBasis, Direction, SuiteReport, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One evaluated benchmark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonBenchmark {
    pub name: String,
    pub unit: String,
    /// Value of the newest run
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
    /// Median of the baseline window, absent without baseline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,
    pub baseline_size: usize,
    /// Coefficient of variation of the baseline window
    pub baseline_cv: f64,
    /// Direction-adjusted change; positive means worse
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    /// `relative` (fraction of baseline) or `absolute` (baseline was zero)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_basis: Option<String>,
    pub verdict: String,
    /// Baseline unit, set only on a unit mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_unit: Option<String>,
    pub severity: String,
    pub previously_tracked: bool,
}

/// A benchmark missing from the newest run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRemoved {
    pub name: String,
    pub unit: String,
    pub last_value: f64,
    pub last_commit: String,
}

/// Alert thresholds as fractions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonThresholds {
    pub alert: f64,
    pub hard: f64,
}

/// Summary of the suite decision
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonSummary {
    pub total: usize,
    pub verdicts: BTreeMap<String, usize>,
    pub removed: usize,
    pub overall: String,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonReport {
    /// Crate version that wrote the report
    pub version: String,
    /// Format name
    pub format: String,
    pub suite: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub repo_url: String,
    pub commit: Commit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_commit: Option<Commit>,
    pub date: u64,
    pub tool: String,
    pub direction: Direction,
    pub thresholds: JsonThresholds,
    pub benchmarks: Vec<JsonBenchmark>,
    pub removed: Vec<JsonRemoved>,
    pub summary: JsonSummary,
}

impl JsonReport {
    /// Build the JSON view of a suite report
    pub fn from_report(report: &SuiteReport, repo_url: &str) -> Self {
        let benchmarks = report
            .benchmarks
            .iter()
            .map(|b| JsonBenchmark {
                name: b.name.clone(),
                unit: b.unit.clone(),
                value: b.value,
                range: b.range,
                baseline: b.baseline_center,
                baseline_size: b.baseline_size,
                baseline_cv: b.baseline_cv,
                change: b.change.map(|c| c.amount),
                change_basis: b.change.map(|c| {
                    match c.basis {
                        ChangeBasis::Relative => "relative",
                        ChangeBasis::Absolute => "absolute",
                    }
                    .to_string()
                }),
                verdict: b.verdict.label().replace(' ', "_"),
                expected_unit: match &b.verdict {
                    Verdict::UnitMismatch { expected, .. } => Some(expected.clone()),
                    _ => None,
                },
                severity: b.severity.to_string(),
                previously_tracked: b.previously_tracked,
            })
            .collect();

        let removed = report
            .removed
            .iter()
            .map(|r| JsonRemoved {
                name: r.name.clone(),
                unit: r.unit.clone(),
                last_value: r.last_value,
                last_commit: r.last_seen.id.clone(),
            })
            .collect();

        let verdicts = report
            .verdict_counts()
            .into_iter()
            .map(|(label, n)| (label.replace(' ', "_"), n))
            .collect();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "benchtrack-report-v1".to_string(),
            suite: report.suite.clone(),
            repo_url: repo_url.to_string(),
            commit: report.commit.clone(),
            previous_commit: report.previous_commit.clone(),
            date: report.date,
            tool: report.tool.clone(),
            direction: report.direction,
            thresholds: JsonThresholds {
                alert: report.alert_threshold,
                hard: report.hard_threshold,
            },
            benchmarks,
            removed,
            summary: JsonSummary {
                total: report.benchmarks.len(),
                verdicts,
                removed: report.removed.len(),
                overall: report.overall.to_string(),
            },
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
