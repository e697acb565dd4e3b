//! Benchmark samples and commit-tagged entries
//!
//! A [`BenchmarkEntry`] is one CI run: the commit it was measured on, the
//! ingestion timestamp, the harness that produced it and its samples.
//! [`parse_entry`] is the only way raw harness JSON becomes an entry, and it
//! rejects anything it cannot represent faithfully instead of coercing it.

use regex::Regex;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Validation failure for harness input
///
/// Always names the offending sample (or the entry itself when the problem
/// is structural) so the CI log points at the right benchmark.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedSampleError {
    #[error("malformed entry: {0}")]
    Entry(String),

    #[error("malformed sample '{name}': {reason}")]
    Sample { name: String, reason: String },

    #[error("malformed sample #{index}: {reason}")]
    Unnamed { index: usize, reason: String },
}

impl MalformedSampleError {
    fn sample(name: &str, reason: impl Into<String>) -> Self {
        Self::Sample {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Person attached to a commit (author or committer)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitPerson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Source-control metadata for an entry
///
/// Used for traceability and rendering only, never for comparison math.
/// Fields this crate does not know about (`distinct`, `tree_id`, ...) are
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<CommitPerson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committer: Option<CommitPerson>,
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Commit {
    /// Commit with only an identifier
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// First seven characters of the id, for tables and annotations
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(7) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }
}

/// Reported uncertainty of a sample
///
/// Harnesses write this either as a number or as text such as
/// `"stddev: 0.00012"`, `"± 56"` or `"+/- 1,024"`. The numeric part is what
/// the comparator uses; the original text is kept so a history file
/// round-trips byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    value: f64,
    text: Option<String>,
}

impl Range {
    /// Numeric range with no textual form
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && value >= 0.0).then_some(Self { value, text: None })
    }

    /// Extract the numeric uncertainty out of harness range text
    ///
    /// Returns `None` when no non-negative finite number can be found.
    pub fn parse(text: &str) -> Option<Self> {
        static NUMBER: OnceLock<Regex> = OnceLock::new();
        let number = NUMBER.get_or_init(|| {
            Regex::new(r"[-+]?(?:\d[\d,]*(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?")
                .expect("range number pattern is a valid regex")
        });

        let found = number.find(text)?;
        let value: f64 = found.as_str().replace(',', "").parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self {
            value,
            text: Some(text.to_string()),
        })
    }

    /// Numeric uncertainty in the sample's unit
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Original text, if the range was read from text
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.text {
            Some(text) => f.write_str(text),
            None => write!(f, "± {}", self.value),
        }
    }
}

impl Serialize for Range {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.text {
            Some(text) => serializer.serialize_str(text),
            None => serializer.serialize_f64(self.value),
        }
    }
}

impl<'de> Deserialize<'de> for Range {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRange {
            Number(f64),
            Text(String),
        }

        match RawRange::deserialize(deserializer)? {
            RawRange::Number(value) => Range::new(value)
                .ok_or_else(|| de::Error::custom(format!("invalid range {value}"))),
            RawRange::Text(text) => Range::parse(&text)
                .ok_or_else(|| de::Error::custom(format!("unparseable range '{text}'"))),
        }
    }
}

/// One named measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSample {
    pub name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    /// Free-form display text (mean, rounds, ...), never interpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl BenchmarkSample {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Numeric uncertainty, zero when none was reported
    pub fn range_value(&self) -> f64 {
        self.range.as_ref().map_or(0.0, Range::value)
    }

    /// Uncertainty in the same unit as `value`
    ///
    /// pytest-benchmark entries carry `range: "stddev: <seconds>"` next to a
    /// value in iterations per second. That spread is rescaled with the
    /// `mean: <seconds> sec` line of `extra` (`stddev / mean * value`). When
    /// no usable mean is present the range is dropped rather than compared
    /// in the wrong unit.
    pub fn range_in_value_units(&self, tool: &str) -> Option<f64> {
        let range = self.range.as_ref()?;
        let timed_stddev = tool == "pytest"
            && range
                .text()
                .is_some_and(|t| t.trim_start().to_ascii_lowercase().starts_with("stddev"));
        if !timed_stddev {
            return Some(range.value());
        }

        match self.extra.as_deref().and_then(mean_seconds) {
            Some(mean) if mean > 0.0 => Some(range.value() / mean * self.value),
            _ => {
                tracing::warn!(
                    benchmark = %self.name,
                    range = %range,
                    "pytest stddev without a mean in extra; ignoring range"
                );
                None
            }
        }
    }
}

fn mean_seconds(extra: &str) -> Option<f64> {
    static MEAN: OnceLock<Regex> = OnceLock::new();
    let mean = MEAN.get_or_init(|| {
        Regex::new(r"(?m)^\s*mean:\s*([0-9.eE+-]+)\s*sec")
            .expect("mean line pattern is a valid regex")
    });
    mean.captures(extra)?[1].parse().ok()
}

/// One CI run tagged to one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub commit: Commit,
    /// Ingestion time, epoch milliseconds
    pub date: u64,
    pub tool: String,
    pub benches: Vec<BenchmarkSample>,
}

impl BenchmarkEntry {
    /// Look up a sample by name
    pub fn sample(&self, name: &str) -> Option<&BenchmarkSample> {
        self.benches.iter().find(|s| s.name == name)
    }

    /// Whether this entry measured `name`
    pub fn contains(&self, name: &str) -> bool {
        self.sample(name).is_some()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    commit: Commit,
    date: u64,
    tool: String,
    benches: Vec<RawSample>,
}

#[derive(Deserialize)]
pub(crate) struct RawSample {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    range: Option<serde_json::Value>,
    #[serde(default)]
    extra: Option<String>,
}

/// Parse one harness entry from JSON
///
/// Validates that `benches` is non-empty, that every sample has a non-empty
/// unique name and a finite numeric value, and that any range is a
/// non-negative number or parseable range text. Units are trimmed but never
/// converted.
///
/// # Example
/// ```
/// use benchtrack::model::parse_entry;
///
/// let raw = r#"{
///     "commit": {"id": "4f2a9c1", "message": "speed up lookups"},
///     "date": 1700000000000,
///     "tool": "pytest",
///     "benches": [{"name": "test_lookup", "value": 1520.5, "unit": " iter/sec ", "range": "stddev: 12"}]
/// }"#;
///
/// let entry = parse_entry(raw).unwrap();
/// assert_eq!(entry.benches[0].unit, "iter/sec");
/// assert_eq!(entry.benches[0].range_value(), 12.0);
/// ```
pub fn parse_entry(raw: &str) -> Result<BenchmarkEntry, MalformedSampleError> {
    let raw: RawEntry =
        serde_json::from_str(raw).map_err(|e| MalformedSampleError::Entry(e.to_string()))?;

    let benches = raw
        .benches
        .into_iter()
        .enumerate()
        .map(|(index, sample)| convert_sample(index, sample))
        .collect::<Result<Vec<_>, _>>()?;

    let entry = BenchmarkEntry {
        commit: raw.commit,
        date: raw.date,
        tool: raw.tool,
        benches,
    };
    validate_entry(&entry)?;
    Ok(entry)
}

pub(crate) fn convert_sample(
    index: usize,
    raw: RawSample,
) -> Result<BenchmarkSample, MalformedSampleError> {
    let name = match raw.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => {
            return Err(MalformedSampleError::Unnamed {
                index,
                reason: "missing or empty name".to_string(),
            })
        }
    };

    let value = match raw.value {
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| MalformedSampleError::sample(&name, "value is not representable"))?,
        Some(other) => {
            return Err(MalformedSampleError::sample(
                &name,
                format!("value must be a number, got {other}"),
            ))
        }
        None => return Err(MalformedSampleError::sample(&name, "missing value")),
    };

    let range = match raw.range {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => Some(
            n.as_f64()
                .and_then(Range::new)
                .ok_or_else(|| MalformedSampleError::sample(&name, format!("invalid range {n}")))?,
        ),
        Some(serde_json::Value::String(text)) => Some(Range::parse(&text).ok_or_else(|| {
            MalformedSampleError::sample(&name, format!("unparseable range '{text}'"))
        })?),
        Some(other) => {
            return Err(MalformedSampleError::sample(
                &name,
                format!("range must be a number or text, got {other}"),
            ))
        }
    };

    Ok(BenchmarkSample {
        name,
        value,
        unit: raw.unit.unwrap_or_default().trim().to_string(),
        range,
        extra: raw.extra,
    })
}

/// Check the entry-level invariants on already-typed samples
///
/// Shared by [`parse_entry`] and the harness adapters.
pub fn validate_entry(entry: &BenchmarkEntry) -> Result<(), MalformedSampleError> {
    if entry.benches.is_empty() {
        return Err(MalformedSampleError::Entry(
            "benches must contain at least one sample".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, sample) in entry.benches.iter().enumerate() {
        if sample.name.trim().is_empty() {
            return Err(MalformedSampleError::Unnamed {
                index,
                reason: "missing or empty name".to_string(),
            });
        }
        if !sample.value.is_finite() {
            return Err(MalformedSampleError::sample(
                &sample.name,
                format!("value {} is not finite", sample.value),
            ));
        }
        if !seen.insert(sample.name.as_str()) {
            return Err(MalformedSampleError::sample(
                &sample.name,
                "duplicate name within entry",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_json(benches: &str) -> String {
        format!(
            r#"{{"commit": {{"id": "abc1234def", "message": "m"}}, "date": 1, "tool": "pytest", "benches": {benches}}}"#
        )
    }

    #[test]
    fn test_parse_entry_basic() {
        let raw = entry_json(
            r#"[{"name": "a", "value": 10.5, "unit": "iter/sec", "extra": "rounds: 5"},
                {"name": "b", "value": 3, "unit": "ns/iter", "range": 0.5}]"#,
        );
        let entry = parse_entry(&raw).unwrap();
        assert_eq!(entry.benches.len(), 2);
        assert_eq!(entry.benches[0].extra.as_deref(), Some("rounds: 5"));
        assert_eq!(entry.benches[1].range_value(), 0.5);
        assert_eq!(entry.commit.short_id(), "abc1234");
    }

    #[test]
    fn test_parse_entry_trims_unit() {
        let raw = entry_json(r#"[{"name": "a", "value": 1, "unit": "  ns/iter\t"}]"#);
        assert_eq!(parse_entry(&raw).unwrap().benches[0].unit, "ns/iter");
    }

    #[test]
    fn test_parse_entry_rejects_empty_benches() {
        let err = parse_entry(&entry_json("[]")).unwrap_err();
        assert!(matches!(err, MalformedSampleError::Entry(_)));
    }

    #[test]
    fn test_parse_entry_rejects_duplicate_names() {
        let raw = entry_json(
            r#"[{"name": "a", "value": 1, "unit": "x"}, {"name": "a", "value": 2, "unit": "x"}]"#,
        );
        let err = parse_entry(&raw).unwrap_err();
        assert_eq!(
            err,
            MalformedSampleError::Sample {
                name: "a".to_string(),
                reason: "duplicate name within entry".to_string()
            }
        );
    }

    #[test]
    fn test_parse_entry_rejects_string_value() {
        let raw = entry_json(r#"[{"name": "slow_path", "value": "12", "unit": "x"}]"#);
        let err = parse_entry(&raw).unwrap_err();
        assert!(err.to_string().contains("slow_path"));
    }

    #[test]
    fn test_parse_entry_rejects_missing_value() {
        let raw = entry_json(r#"[{"name": "a", "unit": "x"}]"#);
        assert!(parse_entry(&raw).unwrap_err().to_string().contains("missing value"));
    }

    #[test]
    fn test_parse_entry_rejects_empty_name() {
        let raw = entry_json(r#"[{"name": "ok", "value": 1, "unit": "x"}, {"name": "  ", "value": 1, "unit": "x"}]"#);
        assert_eq!(
            parse_entry(&raw).unwrap_err(),
            MalformedSampleError::Unnamed {
                index: 1,
                reason: "missing or empty name".to_string()
            }
        );
    }

    #[test]
    fn test_parse_entry_rejects_bad_range() {
        let raw = entry_json(r#"[{"name": "a", "value": 1, "unit": "x", "range": "wobbly"}]"#);
        assert!(parse_entry(&raw).unwrap_err().to_string().contains("wobbly"));

        let raw = entry_json(r#"[{"name": "a", "value": 1, "unit": "x", "range": -2}]"#);
        assert!(parse_entry(&raw).is_err());
    }

    #[test]
    fn test_parse_entry_rejects_invalid_json() {
        assert!(matches!(
            parse_entry("{not json").unwrap_err(),
            MalformedSampleError::Entry(_)
        ));
    }

    #[test]
    fn test_range_parse_formats() {
        assert_eq!(Range::parse("stddev: 3.37e-7").unwrap().value(), 3.37e-7);
        assert_eq!(Range::parse("± 56").unwrap().value(), 56.0);
        assert_eq!(Range::parse("+/- 1,024").unwrap().value(), 1024.0);
        assert_eq!(Range::parse(".5").unwrap().value(), 0.5);
        assert!(Range::parse("n/a").is_none());
        assert!(Range::parse("-3").is_none());
    }

    #[test]
    fn test_range_serializes_original_text() {
        let sample = BenchmarkSample::new("a", 1.0, "x").with_range(Range::parse("± 56").unwrap());
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains(r#""range":"± 56""#));

        let numeric = BenchmarkSample::new("a", 1.0, "x").with_range(Range::new(2.5).unwrap());
        let json = serde_json::to_string(&numeric).unwrap();
        assert!(json.contains(r#""range":2.5"#));
    }

    #[test]
    fn test_commit_preserves_unknown_fields() {
        let raw = r#"{"id": "abc", "message": "m", "distinct": true, "tree_id": "t1"}"#;
        let commit: Commit = serde_json::from_str(raw).unwrap();
        assert_eq!(commit.extra.len(), 2);
        let back = serde_json::to_value(&commit).unwrap();
        assert_eq!(back["tree_id"], "t1");
        assert_eq!(back["distinct"], true);
    }

    #[test]
    fn test_short_id_handles_short_ids() {
        assert_eq!(Commit::with_id("abc").short_id(), "abc");
    }

    #[test]
    fn test_pytest_stddev_rescaled_to_ops() {
        let sample = BenchmarkSample::new("test_check", 1000.0, "iter/sec")
            .with_range(Range::parse("stddev: 0.0001").unwrap())
            .with_extra("mean: 0.001 sec\nrounds: 4865");

        let range = sample.range_in_value_units("pytest").unwrap();
        assert!((range - 100.0).abs() < 1e-9);
        // other tools report ranges in the value's unit already
        assert_eq!(sample.range_in_value_units("customBiggerIsBetter"), Some(0.0001));
    }

    #[test]
    fn test_pytest_stddev_without_mean_has_no_range() {
        let sample = BenchmarkSample::new("test_check", 1000.0, "iter/sec")
            .with_range(Range::parse("stddev: 0.0001").unwrap())
            .with_extra("rounds: 4865");
        assert_eq!(sample.range_in_value_units("pytest"), None);
    }

    #[test]
    fn test_plus_minus_range_kept_for_pytest() {
        let sample = BenchmarkSample::new("test_check", 1000.0, "iter/sec")
            .with_range(Range::parse("± 100").unwrap());
        assert_eq!(sample.range_in_value_units("pytest"), Some(100.0));
        assert_eq!(BenchmarkSample::new("x", 1.0, "ops").range_in_value_units("pytest"), None);
    }
}
