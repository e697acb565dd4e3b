use anyhow::{Context, Result};
use benchtrack::cli::{Cli, Command, IngestArgs};
use benchtrack::harness::parse_harness_output;
use benchtrack::ingest::{self, IngestOptions};
use benchtrack::model::{parse_entry, BenchmarkEntry, Commit};
use clap::Parser;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// Exit code for anything that aborts the run (bad input, history, config, I/O)
const ABORT_EXIT_CODE: i32 = 2;

/// Initialize tracing subscriber for debug output
///
/// `--debug` forces TRACE; otherwise output appears only when RUST_LOG is
/// set, so reports on stdout stay clean.
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Read --input as a ready entry, or as raw harness output with --tool/--commit
fn read_entry(args: &IngestArgs) -> Result<BenchmarkEntry> {
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read input {}", args.input.display()))?;

    let entry = match (args.tool, &args.commit) {
        (Some(tool), Some(commit_path)) => {
            let commit_json = fs::read_to_string(commit_path)
                .with_context(|| format!("failed to read commit {}", commit_path.display()))?;
            let commit: Commit = serde_json::from_str(&commit_json)
                .with_context(|| format!("invalid commit JSON in {}", commit_path.display()))?;
            parse_harness_output(tool, &raw, commit, now_millis())
        }
        _ => parse_entry(&raw),
    };
    entry.with_context(|| format!("invalid benchmark input {}", args.input.display()))
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Ingest(args) => {
            let resolved = args.evaluation.resolve()?;
            let entry = read_entry(&args)?;

            let options = IngestOptions {
                history_path: args.history.clone(),
                suite: args.suite.clone(),
                config: resolved.config,
                sinks: resolved.sinks,
                policy: resolved.policy,
                repo_url: args.repo_url.clone(),
                retries: args.retries,
                dry_run: args.dry_run,
            };
            let outcome = ingest::ingest(entry, &options)?;
            Ok(outcome.exit_code)
        }
        Command::Check(args) => {
            let resolved = args.evaluation.resolve()?;
            let mut options = IngestOptions::new(args.history, args.suite);
            options.config = resolved.config;
            options.sinks = resolved.sinks;
            options.policy = resolved.policy;

            let outcome = ingest::check(&options)?;
            Ok(outcome.exit_code)
        }
        Command::Prune(args) => {
            let removed = ingest::prune_file(&args.history, &args.suite, args.max_items)?;
            println!(
                "pruned {} entr{} from suite '{}' in {}",
                removed,
                if removed == 1 { "y" } else { "ies" },
                args.suite,
                args.history.display()
            );
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set or RUST_LOG is present
    init_tracing(cli.debug);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ABORT_EXIT_CODE
        }
    };
    std::process::exit(code);
}
