//! CSV output format for suite reports
//!
//! One row per evaluated benchmark, followed by one row per removed
//! benchmark (verdict `removed`), for spreadsheet analysis.

use crate::regression::SuiteReport;

const HEADER: &str = "suite,commit,benchmark,unit,baseline,value,range,change,verdict,severity";

/// CSV record for one benchmark
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub benchmark: String,
    pub unit: String,
    pub baseline: Option<f64>,
    pub value: f64,
    pub range: Option<f64>,
    pub change: Option<f64>,
    pub verdict: String,
    pub severity: String,
}

/// CSV output formatter
#[derive(Debug)]
pub struct CsvOutput {
    suite: String,
    commit: String,
    rows: Vec<CsvRow>,
}

impl CsvOutput {
    /// Create an empty formatter for one suite and commit
    pub fn new(suite: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            commit: commit.into(),
            rows: Vec::new(),
        }
    }

    /// Collect the rows of a suite report
    pub fn from_report(report: &SuiteReport) -> Self {
        let mut output = Self::new(&report.suite, &report.commit.id);
        for b in &report.benchmarks {
            output.add_row(CsvRow {
                benchmark: b.name.clone(),
                unit: b.unit.clone(),
                baseline: b.baseline_center,
                value: b.value,
                range: b.range,
                change: b.change.map(|c| c.amount),
                verdict: b.verdict.label().to_string(),
                severity: b.severity.to_string(),
            });
        }
        for r in &report.removed {
            output.add_row(CsvRow {
                benchmark: r.name.clone(),
                unit: r.unit.clone(),
                baseline: None,
                value: r.last_value,
                range: None,
                change: None,
                verdict: "removed".to_string(),
                severity: String::new(),
            });
        }
        output
    }

    pub fn add_row(&mut self, row: CsvRow) {
        self.rows.push(row);
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_number(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    fn format_row(&self, row: &CsvRow) -> String {
        [
            Self::escape_field(&self.suite),
            Self::escape_field(&self.commit),
            Self::escape_field(&row.benchmark),
            Self::escape_field(&row.unit),
            Self::format_number(row.baseline),
            row.value.to_string(),
            Self::format_number(row.range),
            Self::format_number(row.change),
            Self::escape_field(&row.verdict),
            row.severity.clone(),
        ]
        .join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::from(HEADER);
        output.push('\n');
        for row in &self.rows {
            output.push_str(&self.format_row(row));
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str) -> CsvRow {
        CsvRow {
            benchmark: name.to_string(),
            unit: "iter/sec".to_string(),
            baseline: Some(100.0),
            value: 90.0,
            range: Some(2.0),
            change: Some(0.1),
            verdict: "regression".to_string(),
            severity: "warn".to_string(),
        }
    }

    #[test]
    fn test_csv_header() {
        let csv = CsvOutput::new("Benchmark", "abc").to_csv();
        assert_eq!(csv, format!("{HEADER}\n"));
    }

    #[test]
    fn test_csv_escape_field_simple() {
        assert_eq!(CsvOutput::escape_field("test_query"), "test_query");
    }

    #[test]
    fn test_csv_escape_field_with_comma() {
        assert_eq!(
            CsvOutput::escape_field("test[a,b]"),
            "\"test[a,b]\""
        );
    }

    #[test]
    fn test_csv_escape_field_with_quote() {
        assert_eq!(
            CsvOutput::escape_field("say \"hi\""),
            "\"say \"\"hi\"\"\""
        );
    }

    #[test]
    fn test_csv_row_format() {
        let mut output = CsvOutput::new("Benchmark", "abc123");
        output.add_row(row("tests/test_a.py::test_query"));
        let csv = output.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "Benchmark,abc123,tests/test_a.py::test_query,iter/sec,100,90,2,0.1,regression,warn"
        );
    }

    #[test]
    fn test_csv_missing_numbers_are_empty() {
        let mut output = CsvOutput::new("Benchmark", "abc123");
        output.add_row(CsvRow {
            baseline: None,
            range: None,
            change: None,
            verdict: "insufficient data".to_string(),
            severity: "pass".to_string(),
            ..row("new")
        });
        assert!(output
            .to_csv()
            .ends_with("new,iter/sec,,90,,,insufficient data,pass\n"));
    }
}
