use std::io::{self, Write};

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tsbench_query_gen::{
    backends::{BackendOptions, Format},
    devops::{DevopsCore, QUERY_TYPES},
    interval::{self, TimeInterval},
};

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Interval(#[from] interval::Error),

    #[error("cannot write query types: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, clap::Parser)]
pub(crate) struct Config {
    /// Only list the query types this format supports
    #[clap(long = "format", env = "TSBENCH_FORMAT", action)]
    format: Option<Format>,
}

pub(crate) fn command(config: Config) -> Result<(), Error> {
    let formats: Vec<Format> = match config.format {
        Some(format) => vec![format],
        None => Format::ALL.to_vec(),
    };

    // support only depends on the backend, not on the range or the fleet
    let start = DateTime::<Utc>::default();
    let interval = TimeInterval::new(start, start + TimeDelta::hours(24))?;
    let mut generators: Vec<_> = formats
        .iter()
        .map(|format| {
            let core = DevopsCore::new(interval, 1, 1);
            (
                *format,
                format.devops_generator(core, BackendOptions::default()),
            )
        })
        .collect();

    let width = QUERY_TYPES
        .iter()
        .map(|t| t.tag.len())
        .max()
        .unwrap_or_default();
    let mut out = io::stdout().lock();
    for query_type in QUERY_TYPES {
        let supported: Vec<_> = generators
            .iter_mut()
            .filter_map(|(format, generator)| {
                query_type
                    .query
                    .is_supported_by(generator.as_mut())
                    .then(|| format.as_str())
            })
            .collect();
        if supported.is_empty() {
            continue;
        }
        writeln!(
            out,
            "{:<width$}  {} [{}]",
            query_type.tag,
            query_type.query,
            supported.join(", ")
        )?;
    }
    out.flush()?;
    Ok(())
}
