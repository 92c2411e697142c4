use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;
use tsbench_query_gen::{
    backends::{BackendOptions, Format},
    generate::{self, GenerateConfig},
};

use super::common::{parse_timestamp, resolve_seed};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Generate(#[from] generate::Error),

    #[error("cannot create {}: {source}", path.display())]
    CreateFile { path: PathBuf, source: io::Error },
}

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    /// Database the queries are rendered for
    #[clap(
        long = "format",
        env = "TSBENCH_FORMAT",
        default_value = "timescaledb",
        action
    )]
    format: Format,

    /// Query type to generate, see `tsbench query-types`
    #[clap(long = "query-type", env = "TSBENCH_QUERY_TYPE", action)]
    query_type: String,

    /// Number of hosts in the simulated fleet
    #[clap(long = "scale", env = "TSBENCH_SCALE", default_value = "1", action)]
    scale: usize,

    /// Seed of the random generator, 0 derives one from the current time
    #[clap(long = "seed", env = "TSBENCH_SEED", default_value = "0", action)]
    seed: u64,

    /// Beginning of the benchmark time range (RFC3339)
    #[clap(
        long = "timestamp-start",
        env = "TSBENCH_TIMESTAMP_START",
        default_value = "2016-01-01T00:00:00Z",
        value_parser = parse_timestamp
    )]
    timestamp_start: DateTime<Utc>,

    /// End of the benchmark time range (RFC3339)
    #[clap(
        long = "timestamp-end",
        env = "TSBENCH_TIMESTAMP_END",
        default_value = "2016-01-02T06:00:00Z",
        value_parser = parse_timestamp
    )]
    timestamp_end: DateTime<Utc>,

    /// Number of queries to generate
    #[clap(
        long = "queries",
        env = "TSBENCH_QUERIES",
        default_value = "1000",
        action
    )]
    queries: u64,

    /// Group of an interleaved generation this process produces, `0..groups`
    #[clap(
        long = "interleaved-generation-group-id",
        env = "TSBENCH_INTERLEAVED_GENERATION_GROUP_ID",
        default_value = "0",
        action
    )]
    interleaved_group_id: u64,

    /// Number of processes splitting one generated workload between them
    #[clap(
        long = "interleaved-generation-groups",
        env = "TSBENCH_INTERLEAVED_GENERATION_GROUPS",
        default_value = "1",
        action
    )]
    interleaved_groups: u64,

    /// TimescaleDB: bucket time with `time_bucket()` instead of `date_trunc()`
    #[clap(long = "use-time-bucket", env = "TSBENCH_USE_TIME_BUCKET", action)]
    use_time_bucket: bool,

    /// Write the query stream here instead of stdout
    #[clap(short = 'o', long = "file", env = "TSBENCH_QUERIES_FILE", action)]
    file: Option<PathBuf>,
}

pub(crate) fn command(config: Config) -> Result<(), Error> {
    let generate_config = GenerateConfig {
        format: config.format,
        query_type: config.query_type,
        scale: config.scale,
        seed: resolve_seed(config.seed),
        start: config.timestamp_start,
        end: config.timestamp_end,
        queries: config.queries,
        interleaved_group_id: config.interleaved_group_id,
        interleaved_groups: config.interleaved_groups,
        backend: BackendOptions {
            use_time_bucket: config.use_time_bucket,
        },
    };

    let out: Box<dyn Write> = match &config.file {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|source| {
            Error::CreateFile {
                path: path.clone(),
                source,
            }
        })?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = generate::generate(&generate_config, out)?;
    info!(
        written = summary.written,
        labels = summary.by_label.len(),
        "query generation complete"
    );
    Ok(())
}
