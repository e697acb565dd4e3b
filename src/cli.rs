//! CLI argument parsing for benchtrack

use crate::emitter::{ExitPolicy, Sink};
use crate::harness::Tool;
use crate::regression::{parse_threshold, Direction, RegressionConfig};
use crate::settings::Settings;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "benchtrack")]
#[command(version)]
#[command(about = "Benchmark history tracking and regression gating for CI", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output (to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Append a new benchmark run to the history, evaluate it and report
    Ingest(IngestArgs),
    /// Evaluate the newest run already in the history, without writing
    Check(CheckArgs),
    /// Keep only the newest entries of a suite
    Prune(PruneArgs),
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Benchmark entry JSON, or raw harness output with --tool
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// History file (.json, or .js for a dashboard data.js file)
    #[arg(long, value_name = "FILE")]
    pub history: PathBuf,

    /// Suite name within the history
    #[arg(long, value_name = "NAME")]
    pub suite: String,

    /// Harness that produced --input (pytest, cargo, customBiggerIsBetter, customSmallerIsBetter)
    #[arg(long, value_name = "TOOL", requires = "commit")]
    pub tool: Option<Tool>,

    /// Commit metadata JSON for --tool input
    #[arg(long, value_name = "FILE", requires = "tool")]
    pub commit: Option<PathBuf>,

    /// Repository URL recorded in the history
    #[arg(long, value_name = "URL")]
    pub repo_url: Option<String>,

    /// Persist attempts after a concurrent writer changed the history
    #[arg(long, value_name = "N", default_value = "3")]
    pub retries: usize,

    /// Evaluate and report without writing the history
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub evaluation: EvaluationArgs,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// History file
    #[arg(long, value_name = "FILE")]
    pub history: PathBuf,

    /// Suite name within the history
    #[arg(long, value_name = "NAME")]
    pub suite: String,

    #[command(flatten)]
    pub evaluation: EvaluationArgs,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    /// History file
    #[arg(long, value_name = "FILE")]
    pub history: PathBuf,

    /// Suite name within the history
    #[arg(long, value_name = "NAME")]
    pub suite: String,

    /// Number of newest entries to keep
    #[arg(long, value_name = "N")]
    pub max_items: usize,
}

/// Evaluation and reporting flags shared by `ingest` and `check`
#[derive(Args, Debug, Default)]
pub struct EvaluationArgs {
    /// Soft regression threshold as a ratio (1.05) or percentage (105%) [default: 1.05]
    #[arg(long, value_name = "RATIO", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Hard regression threshold; regressions beyond it fail [default: 1.10]
    #[arg(long, value_name = "RATIO", value_parser = parse_threshold)]
    pub hard_threshold: Option<f64>,

    /// Minimum baseline samples before a verdict is given [default: 3]
    #[arg(long, value_name = "N")]
    pub min_baseline: Option<usize>,

    /// Number of previous entries in the baseline window [default: 10]
    #[arg(long, value_name = "N")]
    pub window: Option<usize>,

    /// Fixed direction (higher-is-better, lower-is-better) instead of inferring from the tool
    #[arg(long, value_name = "DIRECTION")]
    pub direction: Option<Direction>,

    /// Warn when benchmarks disappear from the newest run
    #[arg(long)]
    pub removed_warns: bool,

    /// Settings file (TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report sink: text, annotations, markdown[:PATH], json[:PATH], csv[:PATH] (repeatable)
    #[arg(long = "sink", value_name = "SPEC")]
    pub sinks: Vec<Sink>,

    /// Exit with the fail code on warnings too
    #[arg(long)]
    pub fail_on_warn: bool,
}

/// Evaluation settings after merging flags, settings file and defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub config: RegressionConfig,
    pub sinks: Vec<Sink>,
    pub policy: ExitPolicy,
}

impl EvaluationArgs {
    /// Merge with precedence: flag > settings file > default
    pub fn resolve(&self) -> anyhow::Result<Resolved> {
        let settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        self.resolve_with(&settings)
    }

    /// Merge flags over already-loaded settings
    pub fn resolve_with(&self, settings: &Settings) -> anyhow::Result<Resolved> {
        let mut config = settings.regression_config()?;
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(hard) = self.hard_threshold {
            config.hard_threshold = hard;
        }
        if let Some(min_baseline) = self.min_baseline {
            config.min_baseline_size = min_baseline;
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }
        if self.direction.is_some() {
            config.direction = self.direction;
        }
        if self.removed_warns {
            config.removed_is_warning = true;
        }
        config.validate()?;

        let sinks = if self.sinks.is_empty() {
            settings.output.sinks.clone()
        } else {
            self.sinks.clone()
        };

        let mut policy = settings.exit_policy();
        if self.fail_on_warn {
            policy = policy.blocking_warnings();
        }

        tracing::debug!(?config, sinks = sinks.len(), ?policy, "resolved evaluation settings");
        Ok(Resolved {
            config,
            sinks,
            policy,
        })
    }
}
