//! Adapters from benchmark harness output to [`BenchmarkEntry`]
//!
//! Harnesses report their results in their own formats. Each adapter maps
//! one of them onto samples and hands the result to
//! [`validate_entry`](crate::model::validate_entry), so adapter output obeys
//! the same invariants as a hand-written entry.
//!
//! | tool                    | input                                  | unit       |
//! |-------------------------|----------------------------------------|------------|
//! | `pytest`                | pytest-benchmark `--benchmark-json`    | `iter/sec` |
//! | `cargo`                 | libtest `cargo bench` text             | `ns/iter`  |
//! | `customBiggerIsBetter`  | JSON array of samples                  | as given   |
//! | `customSmallerIsBetter` | JSON array of samples                  | as given   |

use crate::model::{
    convert_sample, validate_entry, BenchmarkEntry, BenchmarkSample, Commit,
    MalformedSampleError, Range, RawSample,
};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Benchmark harness that produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Pytest,
    Cargo,
    CustomBiggerIsBetter,
    CustomSmallerIsBetter,
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::Pytest,
        Tool::Cargo,
        Tool::CustomBiggerIsBetter,
        Tool::CustomSmallerIsBetter,
    ];

    /// Name stored in the entry's `tool` field
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pytest => "pytest",
            Self::Cargo => "cargo",
            Self::CustomBiggerIsBetter => "customBiggerIsBetter",
            Self::CustomSmallerIsBetter => "customSmallerIsBetter",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = MalformedSampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s.trim())
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|t| t.as_str()).collect();
                MalformedSampleError::Entry(format!(
                    "unknown tool '{s}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }
}

/// Convert raw harness output into an entry tagged with `commit` and `date`
///
/// # Example
/// ```
/// use benchtrack::harness::{parse_harness_output, Tool};
/// use benchtrack::model::Commit;
///
/// let raw = "test parse_small ... bench:       1,234 ns/iter (+/- 56)\n";
/// let entry = parse_harness_output(Tool::Cargo, raw, Commit::with_id("abc"), 1).unwrap();
/// assert_eq!(entry.benches[0].value, 1234.0);
/// assert_eq!(entry.benches[0].unit, "ns/iter");
/// assert_eq!(entry.tool, "cargo");
/// ```
pub fn parse_harness_output(
    tool: Tool,
    raw: &str,
    commit: Commit,
    date: u64,
) -> Result<BenchmarkEntry, MalformedSampleError> {
    let benches = match tool {
        Tool::Pytest => parse_pytest(raw)?,
        Tool::Cargo => parse_cargo(raw)?,
        Tool::CustomBiggerIsBetter | Tool::CustomSmallerIsBetter => parse_custom(raw)?,
    };

    let entry = BenchmarkEntry {
        commit,
        date,
        tool: tool.as_str().to_string(),
        benches,
    };
    validate_entry(&entry)?;
    tracing::debug!(tool = tool.as_str(), samples = entry.benches.len(), "parsed harness output");
    Ok(entry)
}

#[derive(Deserialize)]
struct PytestReport {
    benchmarks: Vec<PytestBenchmark>,
}

#[derive(Deserialize)]
struct PytestBenchmark {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fullname: Option<String>,
    stats: PytestStats,
}

#[derive(Deserialize)]
struct PytestStats {
    ops: f64,
    stddev: f64,
    mean: f64,
    rounds: u64,
}

// pytest-benchmark times in seconds but reports throughput in ops; the
// stddev is carried over into ops space so range and value share a unit.
fn parse_pytest(raw: &str) -> Result<Vec<BenchmarkSample>, MalformedSampleError> {
    let report: PytestReport = serde_json::from_str(raw)
        .map_err(|e| MalformedSampleError::Entry(format!("invalid pytest-benchmark JSON: {e}")))?;

    report
        .benchmarks
        .into_iter()
        .enumerate()
        .map(|(index, bench)| {
            let name = bench
                .fullname
                .or(bench.name)
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| MalformedSampleError::Unnamed {
                    index,
                    reason: "benchmark has neither fullname nor name".to_string(),
                })?;
            let stats = bench.stats;

            let mut sample = BenchmarkSample::new(name, stats.ops, "iter/sec")
                .with_extra(format!("mean: {} sec\nrounds: {}", stats.mean, stats.rounds));
            if stats.mean > 0.0 {
                let spread = stats.stddev / stats.mean * stats.ops;
                if let Some(range) = Range::parse(&format!("± {spread}")) {
                    sample = sample.with_range(range);
                }
            }
            Ok(sample)
        })
        .collect()
}

fn parse_cargo(raw: &str) -> Result<Vec<BenchmarkSample>, MalformedSampleError> {
    static BENCH_LINE: OnceLock<Regex> = OnceLock::new();
    let line_re = BENCH_LINE.get_or_init(|| {
        Regex::new(r"^test (.+?)\s+\.\.\. bench:\s+([0-9,.]+) (\S+) \(\+/- ([0-9,.]+)\)\s*$")
            .expect("cargo bench line pattern is a valid regex")
    });

    let mut samples = Vec::new();
    for caps in raw.lines().filter_map(|line| line_re.captures(line)) {
        let name = caps[1].trim().to_string();
        let value: f64 = caps[2].replace(',', "").parse().map_err(|_| {
            MalformedSampleError::Sample {
                name: name.clone(),
                reason: format!("unparseable value '{}'", &caps[2]),
            }
        })?;
        let range = Range::parse(&format!("± {}", &caps[4])).ok_or_else(|| {
            MalformedSampleError::Sample {
                name: name.clone(),
                reason: format!("unparseable deviation '{}'", &caps[4]),
            }
        })?;
        samples.push(BenchmarkSample::new(name, value, &caps[3]).with_range(range));
    }
    Ok(samples)
}

fn parse_custom(raw: &str) -> Result<Vec<BenchmarkSample>, MalformedSampleError> {
    let raw: Vec<RawSample> = serde_json::from_str(raw)
        .map_err(|e| MalformedSampleError::Entry(format!("invalid custom benchmark JSON: {e}")))?;
    raw.into_iter()
        .enumerate()
        .map(|(index, sample)| convert_sample(index, sample))
        .collect()
}
