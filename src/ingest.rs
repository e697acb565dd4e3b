//! End-to-end pipelines: ingest, check and prune
//!
//! `ingest` is load → append → evaluate → emit → persist, in that order.
//! The history file is written last, and only after every sink received
//! its report, so a failure while reporting never leaves a changed or
//! half-written history behind.

use crate::emitter::{emit, EmitError, ExitPolicy, Sink};
use crate::history::{append, prune, HistoryError, HistoryFile};
use crate::model::{validate_entry, BenchmarkEntry, MalformedSampleError};
use crate::regression::{evaluate, ConfigError, RegressionConfig, SuiteReport};
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline failure; every variant aborts the run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Malformed(#[from] MalformedSampleError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("history {} kept changing during ingestion; gave up after {attempts} attempts", .path.display())]
    Contended { path: PathBuf, attempts: usize },
}

/// Inputs of [`ingest`] and [`check`]
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub history_path: PathBuf,
    pub suite: String,
    pub config: RegressionConfig,
    pub sinks: Vec<Sink>,
    pub policy: ExitPolicy,
    /// Replaces the history's `repoUrl` when set
    pub repo_url: Option<String>,
    /// Extra persist attempts after a concurrent writer changed the file
    pub retries: usize,
    /// Evaluate and report, but leave the history file untouched
    pub dry_run: bool,
}

impl IngestOptions {
    pub fn new(history_path: impl Into<PathBuf>, suite: impl Into<String>) -> Self {
        Self {
            history_path: history_path.into(),
            suite: suite.into(),
            config: RegressionConfig::default(),
            sinks: Vec::new(),
            policy: ExitPolicy::default(),
            repo_url: None,
            retries: 3,
            dry_run: false,
        }
    }
}

/// What a pipeline run decided
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: SuiteReport,
    pub exit_code: i32,
    /// Whether the history file was written
    pub persisted: bool,
}

/// Append `entry` to the history, evaluate it, report, then persist
///
/// When another writer changes the history file between load and persist,
/// the entry is re-appended to the fresh file contents and the write is
/// retried up to `options.retries` times. The report is not re-emitted: it
/// describes this entry against the baseline that was current when it was
/// evaluated.
pub fn ingest(entry: BenchmarkEntry, options: &IngestOptions) -> Result<Outcome, IngestError> {
    validate_entry(&entry)?;
    options.config.validate()?;

    let file = HistoryFile::load(&options.history_path)?;
    let mut base = file.history.clone();
    if let Some(url) = &options.repo_url {
        base.repo_url = url.clone();
    }

    let updated = append(&base, &options.suite, entry.clone());
    let report = evaluate(&updated, &options.suite, &options.config)?;
    let exit_code = emit(&report, &updated, &options.sinks, &options.policy)?;

    if options.dry_run {
        tracing::info!(path = %options.history_path.display(), "dry run, history not written");
        return Ok(Outcome {
            report,
            exit_code,
            persisted: false,
        });
    }

    let mut file = file;
    let mut pending = updated;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match file.persist(&pending) {
            Ok(()) => break,
            Err(HistoryError::Conflict { path }) if attempts <= options.retries => {
                tracing::warn!(path = %path.display(), attempt = attempts, "history changed on disk, re-appending");
                file = HistoryFile::load(&options.history_path)?;
                let mut fresh = file.history.clone();
                if let Some(url) = &options.repo_url {
                    fresh.repo_url = url.clone();
                }
                pending = append(&fresh, &options.suite, entry.clone());
            }
            Err(HistoryError::Conflict { path }) => {
                return Err(IngestError::Contended { path, attempts });
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Outcome {
        report,
        exit_code,
        persisted: true,
    })
}

/// Evaluate and report the newest entry already in the history
///
/// Read-only: nothing is appended and the file is never written.
pub fn check(options: &IngestOptions) -> Result<Outcome, IngestError> {
    options.config.validate()?;

    let file = HistoryFile::load(&options.history_path)?;
    let report = evaluate(&file.history, &options.suite, &options.config)?;
    let exit_code = emit(&report, &file.history, &options.sinks, &options.policy)?;

    Ok(Outcome {
        report,
        exit_code,
        persisted: false,
    })
}

/// Keep only the newest `max_items` entries of `suite` in the history file
///
/// Returns the number of entries removed. The file is rewritten only when
/// something was removed.
pub fn prune_file(
    history_path: impl Into<PathBuf>,
    suite: &str,
    max_items: usize,
) -> Result<usize, IngestError> {
    let history_path = history_path.into();
    let file = HistoryFile::load(&history_path)?;
    let pruned = prune(&file.history, suite, max_items)?;

    let before = file.history.suite(suite).map_or(0, |entries| entries.len());
    let after = pruned.suite(suite).map_or(0, |entries| entries.len());
    let removed = before - after;

    if removed > 0 {
        file.persist(&pruned)?;
    }
    Ok(removed)
}
