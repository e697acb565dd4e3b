// Shared fixtures for integration tests
//
// Entries and histories are written as JSON files inside a TempDir, the
// same way CI hands them to the binary.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// One sample: name, value, unit, optional range
pub type Sample<'a> = (&'a str, f64, &'a str, Option<f64>);

pub fn entry_value(commit: &str, date: u64, benches: &[Sample<'_>]) -> Value {
    let benches: Vec<Value> = benches
        .iter()
        .map(|(name, value, unit, range)| {
            let mut sample = json!({ "name": name, "value": value, "unit": unit });
            if let Some(range) = range {
                sample["range"] = json!(format!("± {range}"));
            }
            sample
        })
        .collect();

    json!({
        "commit": {
            "id": commit,
            "message": format!("commit {commit}"),
            "author": { "name": "CI", "email": "ci@example.com" },
            "url": format!("https://github.com/org/repo/commit/{commit}")
        },
        "date": date,
        "tool": "pytest",
        "benches": benches
    })
}

/// Write one entry file and return its path
pub fn write_entry(dir: &Path, commit: &str, date: u64, benches: &[Sample<'_>]) -> PathBuf {
    let path = dir.join(format!("{commit}.json"));
    let content = serde_json::to_string_pretty(&entry_value(commit, date, benches)).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Write a history file with one `test_query` entry per value in suite "Benchmark"
pub fn write_history(path: &Path, values: &[f64]) {
    let entries: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            entry_value(
                &format!("base{i}"),
                1_700_000_000_000 + i as u64,
                &[("test_query", *v, "iter/sec", None)],
            )
        })
        .collect();
    let history = json!({
        "lastUpdate": 1_700_000_000_000u64 + values.len() as u64,
        "repoUrl": "https://github.com/org/repo",
        "entries": { "Benchmark": entries }
    });
    fs::write(path, serde_json::to_string_pretty(&history).unwrap()).unwrap();
}

/// Parse a history file (plain or data.js) into JSON
pub fn read_history(path: &Path) -> Value {
    let content = fs::read_to_string(path).unwrap();
    let json = content
        .strip_prefix("window.BENCHMARK_DATA = ")
        .unwrap_or(&content);
    serde_json::from_str(json).unwrap()
}

pub fn suite_len(history: &Value, suite: &str) -> usize {
    history["entries"][suite].as_array().map_or(0, Vec::len)
}
