//! Latency statistics for benchmark runs.
//!
//! Workers report a [`Stat`] for every query they execute. A single [`StatProcessor`] folds them
//! into one [`StatGroup`] per query label plus the reserved groups below, prints interim reports
//! while the run progresses and a final report when it completes.

use std::path::PathBuf;

use thiserror::Error;

mod group;
mod processor;
pub mod report;
mod stat;

pub use group::{GroupSummary, PercentileValue, StatGroup};
pub use processor::{ProcessorState, RunSummary, StatProcessor, StatProcessorConfig};
pub use stat::Stat;

/// Every observation
pub const ALL_QUERIES: &str = "all-queries";
/// First runs of prewarmed queries
pub const COLD_QUERIES: &str = "cold-queries";
/// Repeated runs of prewarmed queries
pub const WARM_QUERIES: &str = "warm-queries";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),

    #[error("failed to write report: {0}")]
    Report(#[source] std::io::Error),

    #[error("failed to write HDR latencies to {}: {source}", path.display())]
    HdrLatenciesFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
