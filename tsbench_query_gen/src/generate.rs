//! Drive a backend generator to produce a query stream.

use std::{collections::BTreeMap, io::Write};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info};
use tsbench_query::stream::{self, QueryWriter};

use crate::{
    backends::{BackendOptions, Format},
    devops::{self, DevopsCore, DevopsGenerator, DevopsQuery},
    interval::{self, TimeInterval},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("interleaved generation group id {id} must be less than the number of groups {groups}")]
    InvalidInterleave { id: u64, groups: u64 },

    #[error("query {index} was generated without a human label")]
    EmptyLabel { index: u64 },

    #[error("invalid benchmark time range: {0}")]
    Interval(#[from] interval::Error),

    #[error("failed to generate query: {0}")]
    Devops(#[from] devops::Error),

    #[error("failed to write query stream: {0}")]
    Stream(#[from] stream::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What to generate
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub format: Format,
    /// Tag from the query type registry, e.g. `single-groupby-1-1-1`
    pub query_type: String,
    /// Number of simulated hosts
    pub scale: usize,
    pub seed: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Number of queries to generate across all interleaved groups
    pub queries: u64,
    pub interleaved_group_id: u64,
    pub interleaved_groups: u64,
    pub backend: BackendOptions,
}

/// What was written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub written: u64,
    pub by_label: BTreeMap<String, u64>,
}

/// Generate `config.queries` queries and write this group's share to `out`.
///
/// Every process of an interleaved run generates the full sequence from the same seed so the
/// random draws line up, and keeps only every `interleaved_groups`-th query starting at
/// `interleaved_group_id`.
pub fn generate<W: Write>(config: &GenerateConfig, out: W) -> Result<GenerateSummary> {
    if config.interleaved_groups == 0 || config.interleaved_group_id >= config.interleaved_groups
    {
        return Err(Error::InvalidInterleave {
            id: config.interleaved_group_id,
            groups: config.interleaved_groups,
        });
    }

    let query_type = DevopsQuery::from_tag(&config.query_type)?;
    let interval = TimeInterval::new(config.start, config.end)?;
    let core = DevopsCore::new(interval, config.scale, config.seed);
    let mut generator = config.format.devops_generator(core, config.backend);

    write_queries(generator.as_mut(), query_type, config, out)
}

fn write_queries<W: Write>(
    generator: &mut dyn DevopsGenerator,
    query_type: DevopsQuery,
    config: &GenerateConfig,
    out: W,
) -> Result<GenerateSummary> {
    // fail before writing anything when the backend can't render this query type
    if !query_type.is_supported_by(generator) {
        return Err(Error::Devops(devops::Error::UnsupportedQueryType {
            capability: query_type.capability(),
            backend: generator.name(),
        }));
    }

    info!(
        backend = generator.name(),
        query_type = %config.query_type,
        scale = config.scale,
        seed = config.seed,
        queries = config.queries,
        "generating queries"
    );

    let mut writer = QueryWriter::new(out)?;
    let mut summary = GenerateSummary::default();
    let mut query = generator.generate_empty_query();

    for index in 0..config.queries {
        query.reset();
        query_type.fill(generator, &mut query)?;

        if query.human_label().is_empty() {
            return Err(Error::EmptyLabel { index });
        }

        if index % config.interleaved_groups == config.interleaved_group_id {
            writer.write(&query)?;
            *summary
                .by_label
                .entry(query.human_label().to_string())
                .or_default() += 1;
            summary.written += 1;
        }
    }
    writer.finish()?;

    for (label, count) in &summary.by_label {
        debug!(%label, count, "generated queries");
    }

    Ok(summary)
}
