//! Console table for suite reports
//!
//! Column layout mirrors the strace-style summary tables: fixed-width,
//! left-aligned names, a dashed rule under the header.

use crate::emitter::format_value;
use crate::regression::{BenchmarkReport, Overall, SuiteReport, Verdict};
use std::fmt::Write as _;

const HEADERS: [&str; 6] = ["benchmark", "unit", "baseline", "current", "change", "verdict"];

/// Render a suite report as a plain-text table
pub fn render_text(report: &SuiteReport) -> String {
    let rows: Vec<[String; 6]> = report.benchmarks.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} Benchmark suite '{}' at {} ({}, {})",
        status_marker(report.overall),
        report.suite,
        report.commit.short_id(),
        report.tool,
        report.direction
    );
    let baseline = match &report.previous_commit {
        Some(commit) => format!("previous commit {}", commit.short_id()),
        None => "no previous entries".to_string(),
    };
    let _ = writeln!(
        out,
        "Baseline: {}; warn above {:.2}%, fail above {:.2}%",
        baseline,
        report.alert_threshold * 100.0,
        report.hard_threshold * 100.0
    );
    out.push('\n');

    push_row(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join(" "));
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    if !report.removed.is_empty() {
        let _ = writeln!(out, "\nRemoved since baseline:");
        for removed in &report.removed {
            let _ = writeln!(
                out,
                "  {} (last {} {} at {})",
                removed.name,
                format_value(removed.last_value),
                removed.unit,
                removed.last_seen.short_id()
            );
        }
    }

    let counts: Vec<String> = report
        .verdict_counts()
        .into_iter()
        .map(|(label, n)| format!("{n} {label}"))
        .collect();
    let _ = writeln!(
        out,
        "\nOverall: {} ({})",
        report.overall.as_str().to_uppercase(),
        counts.join(", ")
    );
    out
}

fn status_marker(overall: Overall) -> &'static str {
    match overall {
        Overall::Pass => "✅",
        Overall::Warn => "⚠️",
        Overall::Fail => "❌",
    }
}

fn row(benchmark: &BenchmarkReport) -> [String; 6] {
    let current = match benchmark.range {
        Some(range) if range > 0.0 => {
            format!("{} ± {}", format_value(benchmark.value), format_value(range))
        }
        _ => format_value(benchmark.value),
    };
    let verdict = match (&benchmark.verdict, benchmark.severity) {
        (Verdict::UnitMismatch { expected, found }, _) => {
            format!("unit mismatch ({expected} -> {found})")
        }
        (verdict, Overall::Pass) => verdict.label().to_string(),
        (verdict, severity) => format!("{} ({})", verdict.label(), severity),
    };

    [
        benchmark.name.clone(),
        benchmark.unit.clone(),
        benchmark
            .baseline_center
            .map_or_else(|| "-".to_string(), format_value),
        current,
        benchmark
            .change
            .map_or_else(|| "-".to_string(), |c| c.describe()),
        verdict,
    ]
}

fn push_row(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" ").trim_end());
}
