//! Markdown report, suitable for a commit or pull-request comment

use crate::emitter::format_value;
use crate::model::Commit;
use crate::regression::{Overall, SuiteReport};
use std::fmt::Write as _;

/// Render a suite report as markdown
///
/// `repo_url` is used to link commits that carry no URL of their own.
pub fn render_markdown(report: &SuiteReport, repo_url: &str) -> String {
    let mut out = String::new();

    let heading = match report.overall {
        Overall::Fail => "# :x: Performance Alert",
        Overall::Warn => "# :warning: Performance Warning",
        Overall::Pass => "# :white_check_mark: Benchmark Report",
    };
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Suite `{}` at commit {} ({}, {}).",
        report.suite,
        commit_link(&report.commit, repo_url),
        report.tool,
        report.direction
    );
    if let Some(previous) = &report.previous_commit {
        let _ = writeln!(
            out,
            "Compared against the median of recent runs up to {}.",
            commit_link(previous, repo_url)
        );
    }
    let _ = writeln!(
        out,
        "Warn above **{:.2}%**, fail above **{:.2}%**.",
        report.alert_threshold * 100.0,
        report.hard_threshold * 100.0
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "| Benchmark | Baseline | Current | Change | Verdict |");
    let _ = writeln!(out, "|-|-|-|-|-|");
    for benchmark in &report.benchmarks {
        let baseline = benchmark
            .baseline_center
            .map_or_else(|| "-".to_string(), |c| format!("`{}` {}", format_value(c), benchmark.unit));
        let mut current = format!("`{}` {}", format_value(benchmark.value), benchmark.unit);
        if let Some(range) = benchmark.range.filter(|r| *r > 0.0) {
            let _ = write!(current, " (`± {}`)", format_value(range));
        }
        let change = benchmark
            .change
            .map_or_else(|| "-".to_string(), |c| c.describe());
        let verdict = match benchmark.severity {
            Overall::Fail => format!(":x: {}", benchmark.verdict),
            Overall::Warn => format!(":warning: {}", benchmark.verdict),
            Overall::Pass => benchmark.verdict.to_string(),
        };
        let _ = writeln!(
            out,
            "| `{}` | {} | {} | {} | {} |",
            escape_cell(&benchmark.name),
            baseline,
            current,
            change,
            verdict
        );
    }

    if !report.removed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "<details><summary>Removed benchmarks</summary>");
        let _ = writeln!(out);
        for removed in &report.removed {
            let _ = writeln!(
                out,
                "- `{}`: last `{}` {} at {}",
                escape_cell(&removed.name),
                format_value(removed.last_value),
                removed.unit,
                commit_link(&removed.last_seen, repo_url)
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "</details>");
    }

    out
}

fn commit_link(commit: &Commit, repo_url: &str) -> String {
    let url = match &commit.url {
        Some(url) => url.clone(),
        None if !repo_url.is_empty() => {
            format!("{}/commit/{}", repo_url.trim_end_matches('/'), commit.id)
        }
        None => return format!("`{}`", commit.short_id()),
    };
    format!("[`{}`]({})", commit.short_id(), url)
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{append, History};
    use crate::model::{BenchmarkEntry, BenchmarkSample};
    use crate::regression::{evaluate, RegressionConfig};

    fn report(latest: f64, url: Option<&str>) -> SuiteReport {
        let mut history = History::default();
        for i in 0..3 {
            history = append(
                &history,
                "Benchmark",
                BenchmarkEntry {
                    commit: Commit::with_id(format!("prev{i}abcdef")),
                    date: i,
                    tool: "pytest".to_string(),
                    benches: vec![
                        BenchmarkSample::new("tests/a.py::test|pipe", 100.0, "iter/sec"),
                        BenchmarkSample::new("test_old", 1.0, "iter/sec"),
                    ],
                },
            );
        }
        let mut commit = Commit::with_id("0123456789abcdef");
        commit.url = url.map(str::to_string);
        let history = append(
            &history,
            "Benchmark",
            BenchmarkEntry {
                commit,
                date: 3,
                tool: "pytest".to_string(),
                benches: vec![BenchmarkSample::new("tests/a.py::test|pipe", latest, "iter/sec")],
            },
        );
        evaluate(&history, "Benchmark", &RegressionConfig::default()).unwrap()
    }

    #[test]
    fn test_alert_heading_and_row() {
        let md = render_markdown(&report(50.0, None), "https://github.com/org/repo/");

        assert!(md.starts_with("# :x: Performance Alert"));
        assert!(md.contains("[`0123456`](https://github.com/org/repo/commit/0123456789abcdef)"));
        assert!(md.contains(
            "| `tests/a.py::test\\|pipe` | `100` iter/sec | `50` iter/sec | 50.00% worse | :x: regression |"
        ));
        assert!(md.contains("Warn above **5.00%**, fail above **10.00%**."));
    }

    #[test]
    fn test_commit_url_preferred_over_repo_url() {
        let md = render_markdown(&report(100.0, Some("https://example.com/c/1")), "https://x");
        assert!(md.contains("[`0123456`](https://example.com/c/1)"));
        assert!(md.starts_with("# :white_check_mark: Benchmark Report"));
    }

    #[test]
    fn test_removed_section() {
        let md = render_markdown(&report(100.0, None), "");
        assert!(md.contains("<summary>Removed benchmarks</summary>"));
        assert!(md.contains("- `test_old`: last `1` iter/sec at `prev2ab`"));
    }
}
