//! GitHub Actions workflow-command annotations
//!
//! One `::error` per benchmark that fails the suite, one `::warning` per
//! benchmark that warns, a `::notice` for removed benchmarks and always a
//! closing `::notice` with the suite decision.

use crate::emitter::format_value;
use crate::regression::{BenchmarkReport, Overall, SuiteReport};
use std::fmt::Write as _;

/// Render workflow commands for a suite report
pub fn render_annotations(report: &SuiteReport) -> String {
    let mut out = String::new();

    for benchmark in &report.benchmarks {
        let level = match benchmark.severity {
            Overall::Fail => "error",
            Overall::Warn => "warning",
            Overall::Pass => continue,
        };
        let title = format!("{}: {}", benchmark.verdict.label(), benchmark.name);
        let _ = writeln!(
            out,
            "::{level} title={}::{}",
            escape_property(&title),
            escape_data(&describe(report, benchmark))
        );
    }

    if !report.removed.is_empty() {
        let names: Vec<&str> = report.removed.iter().map(|r| r.name.as_str()).collect();
        let _ = writeln!(
            out,
            "::notice title={}::{}",
            escape_property("removed benchmarks"),
            escape_data(&format!(
                "{} benchmark(s) no longer reported: {}",
                names.len(),
                names.join(", ")
            ))
        );
    }

    let _ = writeln!(
        out,
        "::notice title={}::{}",
        escape_property(&format!("benchmark suite {}", report.suite)),
        escape_data(&format!(
            "{} at {}: {} benchmark(s) evaluated",
            report.overall,
            report.commit.short_id(),
            report.benchmarks.len()
        ))
    );
    out
}

fn describe(report: &SuiteReport, benchmark: &BenchmarkReport) -> String {
    let mut message = format!(
        "{} {} at {}",
        format_value(benchmark.value),
        benchmark.unit,
        report.commit.short_id()
    );
    if let Some(center) = benchmark.baseline_center {
        let _ = write!(
            message,
            " vs baseline median {} over {} run(s)",
            format_value(center),
            benchmark.baseline_size
        );
    }
    if let Some(change) = benchmark.change {
        let _ = write!(message, " ({})", change.describe());
    }
    let _ = write!(message, "\nverdict: {}", benchmark.verdict);
    message
}

/// Escape a workflow-command message body
fn escape_data(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a workflow-command property value
fn escape_property(text: &str) -> String {
    escape_data(text).replace(':', "%3A").replace(',', "%2C")
}
