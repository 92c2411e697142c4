use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::PathBuf,
};

use thiserror::Error;
use tracing::info;
use tsbench_runner::{BenchmarkRunner, BenchmarkRunnerConfig, NoopProcessor};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Runner(#[from] tsbench_runner::Error),

    #[error("cannot open {}: {source}", path.display())]
    OpenFile { path: PathBuf, source: io::Error },
}

/// Executor the workers run queries through
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum ProcessorKind {
    /// Execute nothing, optionally sleeping for `--simulated-latency`
    Noop,
}

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    /// Query stream to replay, stdin if not given
    #[clap(short = 'f', long = "file", env = "TSBENCH_QUERIES_FILE", action)]
    file: Option<PathBuf>,

    /// Query executor
    #[clap(
        long = "processor",
        env = "TSBENCH_PROCESSOR",
        value_enum,
        default_value = "noop",
        action
    )]
    processor: ProcessorKind,

    /// Noop processor: time to sleep for every query, e.g. `5ms`
    #[clap(long = "simulated-latency", env = "TSBENCH_SIMULATED_LATENCY", action)]
    simulated_latency: Option<humantime::Duration>,

    /// Number of concurrent workers
    #[clap(long = "workers", env = "TSBENCH_WORKERS", default_value = "1", action)]
    workers: usize,

    /// Number of queries to run, 0 for all of the input
    #[clap(
        long = "max-queries",
        env = "TSBENCH_MAX_QUERIES",
        default_value = "0",
        action
    )]
    limit: u64,

    /// Number of leading queries left out of the statistics
    #[clap(long = "burn-in", env = "TSBENCH_BURN_IN", default_value = "0", action)]
    burn_in: u64,

    /// Print an interim report every this many queries, 0 to disable
    #[clap(
        long = "print-interval",
        env = "TSBENCH_PRINT_INTERVAL",
        default_value = "0",
        action
    )]
    print_interval: u64,

    /// Print an interim report at this period, e.g. `10s`
    #[clap(long = "reporting-period", env = "TSBENCH_REPORTING_PERIOD", action)]
    reporting_period: Option<humantime::Duration>,

    /// Run every query twice and report cold and warm runs separately
    #[clap(long = "prewarm-queries", env = "TSBENCH_PREWARM_QUERIES", action)]
    prewarm_queries: bool,

    /// Send all queries about the same host to the same worker
    #[clap(long = "hash-workers", env = "TSBENCH_HASH_WORKERS", action)]
    hash_workers: bool,

    /// Processor verbosity, 0 to 4. From 1 on every query is printed
    #[clap(long = "debug", env = "TSBENCH_DEBUG", default_value = "0", action)]
    debug: u8,

    /// Print the response of every query
    #[clap(long = "print-responses", env = "TSBENCH_PRINT_RESPONSES", action)]
    print_responses: bool,

    /// Percentiles shown for every query group
    #[clap(
        long = "percentiles",
        env = "TSBENCH_PERCENTILES",
        default_value = "50,90,95,99",
        value_delimiter = ',',
        action
    )]
    percentiles: Vec<f64>,

    /// Write the percentile ladder of all queries to this file
    #[clap(long = "hdr-latencies", env = "TSBENCH_HDR_LATENCIES", action)]
    hdr_latencies_file: Option<PathBuf>,

    /// Write the configuration and the summary of the run as JSON to this file
    #[clap(long = "results-file", env = "TSBENCH_RESULTS_FILE", action)]
    results_file: Option<PathBuf>,
}

pub(crate) async fn command(config: Config) -> Result<(), Error> {
    let runner_config = BenchmarkRunnerConfig {
        workers: config.workers,
        limit: config.limit,
        burn_in: config.burn_in,
        print_interval: config.print_interval,
        reporting_period: config.reporting_period.map(Into::into),
        prewarm_queries: config.prewarm_queries,
        hash_workers: config.hash_workers,
        debug: config.debug,
        print_responses: config.print_responses,
        percentiles: config.percentiles,
        hdr_latencies_file: config.hdr_latencies_file,
        results_file: config.results_file,
    };
    let mut runner = BenchmarkRunner::new(runner_config)?;

    let input: Box<dyn Read + Send> = match &config.file {
        Some(path) => Box::new(BufReader::new(File::open(path).map_err(|source| {
            Error::OpenFile {
                path: path.clone(),
                source,
            }
        })?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let simulated_latency = config.simulated_latency.map(Into::into);
    let debug = config.debug;
    let print_responses = config.print_responses;
    let new_processor = match config.processor {
        ProcessorKind::Noop => {
            move || NoopProcessor::new(simulated_latency, debug, print_responses)
        }
    };

    // interim reports go to stderr, the final report to stdout
    let summary = runner
        .run(input, new_processor, io::stderr(), io::stdout())
        .await?;
    info!(
        queries = summary.queries,
        wall_clock_secs = summary.wall_clock_secs,
        "benchmark run complete"
    );
    Ok(())
}
