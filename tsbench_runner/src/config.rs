use std::{path::PathBuf, time::Duration};

use serde::Serialize;
use thiserror::Error;
use tsbench_stats::StatProcessorConfig;

/// Highest supported `debug` level
pub const MAX_DEBUG_LEVEL: u8 = 4;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum ConfigError {
    #[error("number of workers must be greater than 0")]
    NoWorkers,

    #[error("burn-in ({burn_in}) must not be larger than the query limit ({limit})")]
    BurnInExceedsLimit { burn_in: u64, limit: u64 },

    #[error("debug level must be between 0 and {MAX_DEBUG_LEVEL}; got {0}")]
    DebugLevel(u8),

    #[error("percentiles must be in (0, 100]; got {0}")]
    InvalidPercentile(f64),
}

/// Settings of a single benchmark run
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRunnerConfig {
    /// Number of concurrent workers, each owning one query processor
    pub workers: usize,
    /// Maximum number of queries to execute, `0` for the whole input
    pub limit: u64,
    /// Number of leading queries left out of the statistics
    pub burn_in: u64,
    /// Emit an interim report every this many queries, `0` to disable
    pub print_interval: u64,
    /// Emit an interim report whenever this much time passed since the last one
    pub reporting_period: Option<Duration>,
    /// Run every query twice, once cold and once warm
    pub prewarm_queries: bool,
    /// Route queries to workers by the hash of their affinity key
    pub hash_workers: bool,
    /// Verbosity of the query processors, `0..=4`
    pub debug: u8,
    /// Ask query processors to print their responses
    pub print_responses: bool,
    /// Percentiles (0-100) shown for every statistics group
    pub percentiles: Vec<f64>,
    pub hdr_latencies_file: Option<PathBuf>,
    /// Write the configuration and run summary as JSON here
    pub results_file: Option<PathBuf>,
}

impl Default for BenchmarkRunnerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            limit: 0,
            burn_in: 0,
            print_interval: 0,
            reporting_period: None,
            prewarm_queries: false,
            hash_workers: false,
            debug: 0,
            print_responses: false,
            percentiles: StatProcessorConfig::default().percentiles,
            hdr_latencies_file: None,
            results_file: None,
        }
    }
}

impl BenchmarkRunnerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.limit > 0 && self.burn_in > self.limit {
            return Err(ConfigError::BurnInExceedsLimit {
                burn_in: self.burn_in,
                limit: self.limit,
            });
        }
        if self.debug > MAX_DEBUG_LEVEL {
            return Err(ConfigError::DebugLevel(self.debug));
        }
        if let Some(p) = self
            .percentiles
            .iter()
            .find(|p| !(**p > 0.0 && **p <= 100.0))
        {
            return Err(ConfigError::InvalidPercentile(*p));
        }
        Ok(())
    }

    pub(crate) fn stat_processor_config(&self) -> StatProcessorConfig {
        StatProcessorConfig {
            workers: self.workers,
            limit: self.limit,
            burn_in: self.burn_in,
            print_interval: self.print_interval,
            reporting_period: self.reporting_period,
            prewarm_queries: self.prewarm_queries,
            percentiles: self.percentiles.clone(),
            hdr_latencies_file: self.hdr_latencies_file.clone(),
        }
    }
}
