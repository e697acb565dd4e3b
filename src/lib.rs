//! Benchtrack - benchmark history tracking and regression gating for CI
//!
//! This library ingests one benchmark run per commit into an append-only
//! history file and decides, benchmark by benchmark, whether the run is a
//! regression, an improvement or noise relative to a trailing baseline.
//! The suite-level pass / warn / fail decision maps to a CI exit code.

pub mod annotation_output;
pub mod cli;
pub mod csv_output;
pub mod emitter;
pub mod harness;
pub mod history;
pub mod ingest;
pub mod json_output;
pub mod markdown_output;
pub mod model;
pub mod regression;
pub mod settings;
pub mod text_output;
