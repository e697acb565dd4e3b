//! Append-only benchmark history
//!
//! The history file is the single source of truth for past runs:
//!
//! ```json
//! { "lastUpdate": 1700000000000, "repoUrl": "https://...",
//!   "entries": { "Benchmark": [ <BenchmarkEntry>, ... ] } }
//! ```
//!
//! Every operation here that "changes" a [`History`] returns a new value and
//! leaves its input untouched, so callers can diff before and after. Suite
//! names serialize sorted (`BTreeMap`) and entries keep append order, so
//! persisting an unchanged history is byte-identical.
//!
//! Files written by dashboard tooling may carry a
//! `window.BENCHMARK_DATA = ` prefix; it is accepted on load and written
//! back when the destination ends in `.js`.

use crate::model::BenchmarkEntry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Assignment prefix used by `data.js` dashboard files
pub const DATA_JS_PREFIX: &str = "window.BENCHMARK_DATA = ";

/// History store errors
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("history {origin} is corrupt: {reason}")]
    Corrupt { origin: String, reason: String },

    #[error("failed to read history {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write history {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history {} changed on disk since it was loaded", .path.display())]
    Conflict { path: PathBuf },

    #[error("unknown suite '{0}'")]
    UnknownSuite(String),

    #[error("suite '{0}' has no entries")]
    EmptySuite(String),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// All benchmark entries, grouped by suite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct History {
    /// Epoch milliseconds of the most recent ingestion
    #[serde(default)]
    pub last_update: u64,

    /// Informational only
    #[serde(default)]
    pub repo_url: String,

    /// Suite name -> entries in append (chronological) order
    pub entries: BTreeMap<String, Vec<BenchmarkEntry>>,

    /// Top-level fields this crate does not know, written back unchanged
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Where a baseline window ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Window precedes the newest entry
    Latest,
    /// Window precedes the entry at this index (clamped to the suite length)
    Before(usize),
}

impl History {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Self::default()
        }
    }

    /// Parse a history from JSON (optionally `data.js`-prefixed)
    ///
    /// `origin` names the source in error messages.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self> {
        let json = strip_data_js_prefix(content);
        if json.trim().is_empty() {
            return Err(HistoryError::Corrupt {
                origin: origin.to_string(),
                reason: "file is empty".to_string(),
            });
        }

        serde_json::from_str(json).map_err(|e| HistoryError::Corrupt {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize with stable ordering, optionally with the `data.js` prefix
    pub fn to_json_string(&self, data_js: bool) -> Result<String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| HistoryError::Corrupt {
            origin: "<in-memory>".to_string(),
            reason: e.to_string(),
        })?;

        let mut out = String::with_capacity(json.len() + DATA_JS_PREFIX.len() + 1);
        if data_js {
            out.push_str(DATA_JS_PREFIX);
        }
        out.push_str(&json);
        out.push('\n');
        Ok(out)
    }

    /// Entries of a suite, oldest first
    pub fn suite(&self, name: &str) -> Option<&[BenchmarkEntry]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Newest entry of a suite
    pub fn latest(&self, suite: &str) -> Option<&BenchmarkEntry> {
        self.suite(suite).and_then(|entries| entries.last())
    }

    /// Suite names in serialization order
    pub fn suite_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn strip_data_js_prefix(content: &str) -> &str {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    let Some(rest) = trimmed.strip_prefix("window.BENCHMARK_DATA") else {
        return trimmed;
    };
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('=').unwrap_or(rest);
    let rest = rest.trim_end();
    rest.strip_suffix(';').unwrap_or(rest)
}

/// Return a new history with `entry` appended to `suite`
///
/// The suite is created when absent. `last_update` advances to the entry's
/// date; it never moves backwards. Prior entries are carried over unchanged.
///
/// # Example
/// ```
/// use benchtrack::history::{append, History};
/// use benchtrack::model::{BenchmarkEntry, BenchmarkSample, Commit};
///
/// let before = History::new("https://example.com/repo");
/// let entry = BenchmarkEntry {
///     commit: Commit::with_id("abc123"),
///     date: 1_700_000_000_000,
///     tool: "pytest".to_string(),
///     benches: vec![BenchmarkSample::new("test_parse", 1500.0, "iter/sec")],
/// };
///
/// let after = append(&before, "Benchmark", entry);
/// assert!(before.entries.is_empty());
/// assert_eq!(after.suite("Benchmark").unwrap().len(), 1);
/// ```
pub fn append(history: &History, suite: &str, entry: BenchmarkEntry) -> History {
    let mut next = history.clone();

    if let Some(previous) = history.latest(suite) {
        if entry.date < previous.date {
            tracing::warn!(
                suite,
                new_date = entry.date,
                previous_date = previous.date,
                "appending entry older than the newest one; keeping append order"
            );
        }
    }

    next.last_update = next.last_update.max(entry.date);
    tracing::debug!(suite, commit = %entry.commit.id, benches = entry.benches.len(), "appending entry");
    next.entries.entry(suite.to_string()).or_default().push(entry);
    next
}

/// Most recent `window_size` entries preceding the anchor, oldest first
///
/// Returns fewer entries (down to none) when history is short, and none for
/// an unknown suite: the first run of a suite has no baseline, which callers
/// handle as insufficient data rather than an error.
pub fn baseline_window<'a>(
    history: &'a History,
    suite: &str,
    anchor: Anchor,
    window_size: usize,
) -> &'a [BenchmarkEntry] {
    let Some(entries) = history.suite(suite) else {
        return &[];
    };

    let end = match anchor {
        Anchor::Latest => entries.len().saturating_sub(1),
        Anchor::Before(index) => index.min(entries.len()),
    };
    let start = end.saturating_sub(window_size);
    &entries[start..end]
}

/// Return a new history keeping only the newest `max_items` entries of `suite`
///
/// Explicit maintenance; ingestion never prunes. An unknown suite is an error
/// so a typo does not silently do nothing.
pub fn prune(history: &History, suite: &str, max_items: usize) -> Result<History> {
    let entries = history
        .suite(suite)
        .ok_or_else(|| HistoryError::UnknownSuite(suite.to_string()))?;

    let drop = entries.len().saturating_sub(max_items);
    let mut next = history.clone();
    if drop > 0 {
        next.entries.insert(suite.to_string(), entries[drop..].to_vec());
        tracing::info!(suite, removed = drop, kept = entries.len() - drop, "pruned history");
    }
    Ok(next)
}

/// Write a history to `path`
///
/// The bytes go to a sibling temporary file which is then renamed over the
/// destination, so readers see either the old or the new history, never a
/// partial one. `.js` destinations get the `data.js` prefix.
pub fn persist(history: &History, path: &Path) -> Result<()> {
    let content = history.to_json_string(is_data_js(path))?;
    write_atomically(path, content.as_bytes())
}

fn is_data_js(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "js")
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let write_err = |source| HistoryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Err(e) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(write_err(e));
    }
    Ok(())
}

fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// A history loaded from disk, remembering what the file looked like
///
/// [`HistoryFile::persist`] refuses to overwrite the file when another
/// writer changed it after [`HistoryFile::load`], which lets callers reload
/// and re-append instead of silently dropping the other writer's entry.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
    /// SHA-256 of the bytes loaded; `None` when the file did not exist
    fingerprint: Option<String>,
    pub history: History,
}

impl HistoryFile {
    /// Load a history file; a missing file is an empty history
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "history file not found, starting empty");
                return Ok(Self {
                    path,
                    fingerprint: None,
                    history: History::default(),
                });
            }
            Err(source) => return Err(HistoryError::Read { path, source }),
        };

        let origin = path.display().to_string();
        let content = String::from_utf8(bytes).map_err(|e| HistoryError::Corrupt {
            origin: origin.clone(),
            reason: e.to_string(),
        })?;
        let history = History::from_json_str(&content, &origin)?;

        tracing::debug!(
            path = %origin,
            suites = history.entries.len(),
            "loaded history"
        );

        Ok(Self {
            fingerprint: Some(fingerprint(content.as_bytes())),
            path,
            history,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file existed when loaded
    pub fn existed(&self) -> bool {
        self.fingerprint.is_some()
    }

    /// Persist `history` if the file is still as it was when loaded
    pub fn persist(&self, history: &History) -> Result<()> {
        let current = match fs::read(&self.path) {
            Ok(bytes) => Some(fingerprint(&bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if current != self.fingerprint {
            return Err(HistoryError::Conflict {
                path: self.path.clone(),
            });
        }

        persist(history, &self.path)?;
        tracing::info!(path = %self.path.display(), "persisted history");
        Ok(())
    }
}
