//! Report emission and exit-code policy
//!
//! A [`Sink`] pairs an output format with a destination. [`emit`] renders
//! the suite report into every configured sink and maps the suite decision
//! to a process exit code through an [`ExitPolicy`]. Writing the history is
//! not part of emission; callers persist only after `emit` succeeded.

use crate::annotation_output::render_annotations;
use crate::csv_output::CsvOutput;
use crate::history::History;
use crate::json_output::JsonReport;
use crate::markdown_output::render_markdown;
use crate::regression::{Overall, SuiteReport};
use crate::text_output::render_text;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Report emission errors
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("invalid sink '{0}': expected text, annotations, markdown, json or csv, optionally followed by :<path>")]
    InvalidSink(String),

    #[error("failed to serialize {format} report: {reason}")]
    Render { format: SinkFormat, reason: String },

    #[error("failed to write report to {target}: {source}")]
    Write {
        target: SinkTarget,
        #[source]
        source: io::Error,
    },
}

/// Output format of a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    /// Console table
    Text,
    /// GitHub Actions workflow commands
    Annotations,
    /// Commit/PR comment body
    Markdown,
    Json,
    Csv,
}

impl SinkFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Annotations => "annotations",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for SinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a sink writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    File(PathBuf),
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A report destination, written as `format` or `format:path`
///
/// # Example
/// ```
/// use benchtrack::emitter::{Sink, SinkFormat, SinkTarget};
///
/// let sink: Sink = "markdown:alert.md".parse().unwrap();
/// assert_eq!(sink.format, SinkFormat::Markdown);
/// assert_eq!(sink.target, SinkTarget::File("alert.md".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sink {
    pub format: SinkFormat,
    pub target: SinkTarget,
}

impl Sink {
    pub fn stdout(format: SinkFormat) -> Self {
        Self {
            format,
            target: SinkTarget::Stdout,
        }
    }
}

impl FromStr for Sink {
    type Err = EmitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, path) = match s.trim().split_once(':') {
            Some((name, path)) => (name, Some(path)),
            None => (s.trim(), None),
        };

        let format = match name.to_ascii_lowercase().as_str() {
            "text" | "console" => SinkFormat::Text,
            "annotations" | "github" => SinkFormat::Annotations,
            "markdown" | "md" => SinkFormat::Markdown,
            "json" => SinkFormat::Json,
            "csv" => SinkFormat::Csv,
            _ => return Err(EmitError::InvalidSink(s.to_string())),
        };

        let target = match path {
            None | Some("-") => SinkTarget::Stdout,
            Some("") => return Err(EmitError::InvalidSink(s.to_string())),
            Some(path) => SinkTarget::File(PathBuf::from(path)),
        };

        Ok(Self { format, target })
    }
}

impl<'de> Deserialize<'de> for Sink {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Exit code for each suite decision
///
/// Teams differ on whether a warning should block a merge, so nothing here
/// is fixed; the defaults only block on `fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExitPolicy {
    pub pass: i32,
    pub warn: i32,
    pub fail: i32,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            pass: 0,
            warn: 0,
            fail: 1,
        }
    }
}

impl ExitPolicy {
    /// Same policy, with warnings exiting like failures
    pub fn blocking_warnings(self) -> Self {
        Self {
            warn: self.fail,
            ..self
        }
    }

    pub fn code_for(&self, overall: Overall) -> i32 {
        match overall {
            Overall::Pass => self.pass,
            Overall::Warn => self.warn,
            Overall::Fail => self.fail,
        }
    }
}

/// Render a report in one format
pub fn render(format: SinkFormat, report: &SuiteReport, history: &History) -> Result<String, EmitError> {
    let rendered = match format {
        SinkFormat::Text => render_text(report),
        SinkFormat::Annotations => render_annotations(report),
        SinkFormat::Markdown => render_markdown(report, &history.repo_url),
        SinkFormat::Json => {
            let mut json = JsonReport::from_report(report, &history.repo_url)
                .to_json()
                .map_err(|e| EmitError::Render {
                    format,
                    reason: e.to_string(),
                })?;
            json.push('\n');
            json
        }
        SinkFormat::Csv => CsvOutput::from_report(report).to_csv(),
    };
    Ok(rendered)
}

/// Write a rendered report to any writer
pub fn emit_to<W: Write>(
    writer: &mut W,
    format: SinkFormat,
    report: &SuiteReport,
    history: &History,
) -> Result<(), EmitError> {
    let rendered = render(format, report, history)?;
    writer
        .write_all(rendered.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|source| EmitError::Write {
            target: SinkTarget::Stdout,
            source,
        })
}

/// Write the report to every sink and return the exit code for it
///
/// An empty sink list falls back to a text table on stdout: a report is
/// always produced, even when every benchmark lacks baseline data.
pub fn emit(
    report: &SuiteReport,
    history: &History,
    sinks: &[Sink],
    policy: &ExitPolicy,
) -> Result<i32, EmitError> {
    let fallback = [Sink::stdout(SinkFormat::Text)];
    let sinks = if sinks.is_empty() { &fallback[..] } else { sinks };

    for sink in sinks {
        let rendered = render(sink.format, report, history)?;
        let written = match &sink.target {
            SinkTarget::Stdout => {
                let mut stdout = io::stdout().lock();
                stdout
                    .write_all(rendered.as_bytes())
                    .and_then(|()| stdout.flush())
            }
            SinkTarget::File(path) => fs::write(path, rendered.as_bytes()),
        };
        written.map_err(|source| EmitError::Write {
            target: sink.target.clone(),
            source,
        })?;
        tracing::debug!(format = %sink.format, target = %sink.target, "emitted report");
    }

    let code = policy.code_for(report.overall);
    tracing::info!(suite = %report.suite, overall = %report.overall, exit_code = code, "suite evaluated");
    Ok(code)
}

/// Compact number formatting shared by the human-readable sinks
pub(crate) fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else if value.abs() >= 1.0 {
        format!("{value:.2}")
    } else {
        format!("{value:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::append;
    use crate::model::{BenchmarkEntry, BenchmarkSample, Commit};
    use crate::regression::{evaluate, RegressionConfig};
    use tempfile::TempDir;

    fn fixture(latest: f64) -> (History, SuiteReport) {
        let mut history = History::new("https://example.com/repo");
        for (i, value) in [100.0, 100.0, 100.0, latest].into_iter().enumerate() {
            history = append(
                &history,
                "Benchmark",
                BenchmarkEntry {
                    commit: Commit::with_id(format!("c{i}")),
                    date: i as u64,
                    tool: "pytest".to_string(),
                    benches: vec![BenchmarkSample::new("test_query", value, "iter/sec")],
                },
            );
        }
        let report = evaluate(&history, "Benchmark", &RegressionConfig::default()).unwrap();
        (history, report)
    }

    #[test]
    fn test_sink_parsing() {
        assert_eq!("text".parse::<Sink>().unwrap(), Sink::stdout(SinkFormat::Text));
        assert_eq!(
            "json:-".parse::<Sink>().unwrap(),
            Sink::stdout(SinkFormat::Json)
        );
        assert_eq!(
            "csv:out/report.csv".parse::<Sink>().unwrap().target,
            SinkTarget::File(PathBuf::from("out/report.csv"))
        );
        assert!("xml".parse::<Sink>().is_err());
        assert!("json:".parse::<Sink>().is_err());
    }

    #[test]
    fn test_exit_policy_defaults() {
        let policy = ExitPolicy::default();
        assert_eq!(policy.code_for(Overall::Pass), 0);
        assert_eq!(policy.code_for(Overall::Warn), 0);
        assert_eq!(policy.code_for(Overall::Fail), 1);
        assert_eq!(policy.blocking_warnings().code_for(Overall::Warn), 1);
    }

    #[test]
    fn test_emit_writes_files_and_returns_code() {
        let dir = TempDir::new().unwrap();
        let md = dir.path().join("alert.md");
        let json = dir.path().join("report.json");
        let (history, report) = fixture(50.0);

        let sinks = vec![
            Sink {
                format: SinkFormat::Markdown,
                target: SinkTarget::File(md.clone()),
            },
            Sink {
                format: SinkFormat::Json,
                target: SinkTarget::File(json.clone()),
            },
        ];
        let code = emit(&report, &history, &sinks, &ExitPolicy::default()).unwrap();

        assert_eq!(code, 1);
        assert!(fs::read_to_string(&md).unwrap().contains("Performance Alert"));
        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["summary"]["overall"], "fail");
        assert_eq!(parsed["repo_url"], "https://example.com/repo");
    }

    #[test]
    fn test_emit_to_writer() {
        let (history, report) = fixture(100.0);
        let mut buf = Vec::new();
        emit_to(&mut buf, SinkFormat::Csv, &report, &history).unwrap();
        let csv = String::from_utf8(buf).unwrap();
        assert!(csv.starts_with("suite,commit,benchmark"));
        assert!(csv.contains("Benchmark,c3,test_query,iter/sec,100,100,,0,noise,pass"));
    }

    #[test]
    fn test_emit_missing_directory_is_write_error() {
        let dir = TempDir::new().unwrap();
        let (history, report) = fixture(100.0);
        let sinks = vec![Sink {
            format: SinkFormat::Text,
            target: SinkTarget::File(dir.path().join("missing/report.txt")),
        }];
        let err = emit(&report, &history, &sinks, &ExitPolicy::default()).unwrap_err();
        assert!(matches!(err, EmitError::Write { .. }));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1500.0), "1500");
        assert_eq!(format_value(1520.456), "1520.46");
        assert_eq!(format_value(0.000123), "0.000123");
    }
}
