//! Drives a benchmark run: a scanner decodes the query stream, a pool of workers executes the
//! queries through a [`QueryProcessor`] each, and a single stat processor aggregates and reports
//! their latencies.

use std::path::PathBuf;

use thiserror::Error;

mod config;
mod processor;
mod results;
mod runner;
mod scanner;
mod worker;

pub use config::{BenchmarkRunnerConfig, ConfigError, MAX_DEBUG_LEVEL};
pub use processor::{NoopProcessor, QueryProcessor};
pub use results::RunResults;
pub use runner::{BenchmarkRunner, RunnerState};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid runner configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read queries: {0}")]
    Decode(#[from] tsbench_query::stream::Error),

    #[error("worker {worker} failed to initialize its query processor: {source}")]
    ProcessorInit {
        worker: usize,
        source: anyhow::Error,
    },

    #[error("worker {worker} failed to execute query '{label}': {source}")]
    Processor {
        worker: usize,
        label: String,
        source: anyhow::Error,
    },

    #[error("{task} task failed: {source}")]
    Task {
        task: &'static str,
        source: tokio::task::JoinError,
    },

    #[error(transparent)]
    Stats(#[from] tsbench_stats::Error),

    #[error("failed to write results file {}: {source}", path.display())]
    ResultsFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    SerializeResults(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
