//! The devops use case: CPU metrics reported by a fleet of simulated hosts.
//!
//! Backends take part in the use case by implementing [`DevopsGenerator`] and whichever of the
//! capability traits below they can render. The [`DevopsQuery`] registry then decides at runtime
//! which capability a query type needs.

use std::{fmt::Debug, time::Duration};

use thiserror::Error;
use tsbench_query::Query;

use crate::{
    interval::{self, TimeInterval},
    sampling::{self, SamplingCore},
};

mod query_type;

pub use query_type::{DevopsQuery, QUERY_TYPES, QueryType};

/// Every CPU metric a simulated host reports, in the order they are handed out
pub const CPU_METRICS: &[&str] = &[
    "usage_user",
    "usage_system",
    "usage_idle",
    "usage_nice",
    "usage_iowait",
    "usage_irq",
    "usage_softirq",
    "usage_steal",
    "usage_guest",
    "usage_guest_nice",
];

pub const DOUBLE_GROUPBY_DURATION: Duration = Duration::from_secs(12 * 3600);
pub const HIGH_CPU_DURATION: Duration = Duration::from_secs(12 * 3600);
pub const MAX_ALL_DURATION: Duration = Duration::from_secs(8 * 3600);
/// The window whose end bounds a groupby-orderby-limit query
pub const GROUPBY_ORDERBY_LIMIT_WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot get 0 metrics")]
    ZeroMetrics,

    #[error("too many metrics asked for")]
    TooManyMetrics { requested: usize },

    #[error("unknown query type '{0}', run `tsbench query-types` for the supported ones")]
    UnknownQueryType(String),

    #[error("backend {backend} does not implement {capability}")]
    UnsupportedQueryType {
        capability: &'static str,
        backend: &'static str,
    },

    #[error(transparent)]
    Sampling(#[from] sampling::Error),

    #[error(transparent)]
    Interval(#[from] interval::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The first `n` CPU metrics
pub fn cpu_metrics_slice(n: usize) -> Result<&'static [&'static str]> {
    match n {
        0 => Err(Error::ZeroMetrics),
        n if n > CPU_METRICS.len() => Err(Error::TooManyMetrics { requested: n }),
        n => Ok(&CPU_METRICS[..n]),
    }
}

/// State every devops generator carries: the benchmark time range and the sampling core.
#[derive(Debug, Clone)]
pub struct DevopsCore {
    interval: TimeInterval,
    sampling: SamplingCore,
}

impl DevopsCore {
    pub fn new(interval: TimeInterval, scale: usize, seed: u64) -> Self {
        Self {
            interval,
            sampling: SamplingCore::new(scale, seed),
        }
    }

    pub fn interval(&self) -> TimeInterval {
        self.interval
    }

    pub fn scale(&self) -> usize {
        self.sampling.scale()
    }

    /// A random sub-window of the benchmark range
    pub fn random_window(&mut self, window: Duration) -> Result<TimeInterval> {
        Ok(self.interval.rand_window(window, self.sampling.rng_mut())?)
    }

    pub fn random_hosts(&mut self, count: usize) -> Result<Vec<String>> {
        Ok(self.sampling.random_hosts(count)?)
    }
}

/// Max of `metrics` CPU metrics per minute for `hosts` random hosts over a random `range`.
pub trait SingleGroupbyFiller {
    fn group_by_time(
        &mut self,
        query: &mut Query,
        hosts: usize,
        metrics: usize,
        range: Duration,
    ) -> Result<()>;
}

/// Average `metrics` CPU metrics per hour and host, for all hosts.
pub trait DoubleGroupbyFiller {
    fn group_by_time_and_primary_tag(&mut self, query: &mut Query, metrics: usize) -> Result<()>;
}

/// Max of every CPU metric per hour for `hosts` random hosts.
pub trait MaxAllFiller {
    fn max_all_cpu(&mut self, query: &mut Query, hosts: usize, range: Duration) -> Result<()>;
}

/// The latest reading of every host.
pub trait LastPointFiller {
    fn last_point_per_host(&mut self, query: &mut Query) -> Result<()>;
}

/// The last five one-minute buckets of max `usage_user` before a random point in time.
pub trait GroupbyOrderbyLimitFiller {
    fn group_by_order_by_limit(&mut self, query: &mut Query) -> Result<()>;
}

/// Readings where `usage_user` is over 90, for `hosts` random hosts, or all hosts when `0`.
pub trait HighCpuFiller {
    fn high_cpu_for_hosts(&mut self, query: &mut Query, hosts: usize) -> Result<()>;
}

/// A backend's devops query generator.
///
/// Capability accessors default to `None`; a backend overrides the ones it supports.
pub trait DevopsGenerator: Debug + Send {
    /// The backend name, used in errors and query labels
    fn name(&self) -> &'static str;

    /// An empty query of the payload variant this backend fills
    fn generate_empty_query(&self) -> Query;

    fn as_single_groupby(&mut self) -> Option<&mut dyn SingleGroupbyFiller> {
        None
    }

    fn as_double_groupby(&mut self) -> Option<&mut dyn DoubleGroupbyFiller> {
        None
    }

    fn as_max_all(&mut self) -> Option<&mut dyn MaxAllFiller> {
        None
    }

    fn as_last_point(&mut self) -> Option<&mut dyn LastPointFiller> {
        None
    }

    fn as_groupby_orderby_limit(&mut self) -> Option<&mut dyn GroupbyOrderbyLimitFiller> {
        None
    }

    fn as_high_cpu(&mut self) -> Option<&mut dyn HighCpuFiller> {
        None
    }
}

// Labels are shared by every backend so results from different databases line up.

pub(crate) fn single_groupby_label(
    db: &str,
    metrics: usize,
    hosts: usize,
    range: Duration,
) -> String {
    format!(
        "{db} {metrics} cpu metric(s), random {hosts:4} hosts, random {} by 1m",
        humantime::format_duration(range)
    )
}

pub(crate) fn double_groupby_label(db: &str, metrics: usize) -> String {
    format!(
        "{db} mean of {metrics} metrics, all hosts, random {} by 1h",
        humantime::format_duration(DOUBLE_GROUPBY_DURATION)
    )
}

pub(crate) fn max_all_label(db: &str, hosts: usize, range: Duration) -> String {
    format!(
        "{db} max of all CPU metrics, random {hosts:4} hosts, random {} by 1h",
        humantime::format_duration(range)
    )
}

pub(crate) fn last_point_label(db: &str) -> String {
    format!("{db} last row per host")
}

pub(crate) fn groupby_orderby_limit_label(db: &str) -> String {
    format!("{db} max cpu over last 5 min-intervals (random end)")
}

pub(crate) fn high_cpu_label(db: &str, hosts: usize) -> String {
    if hosts == 0 {
        format!("{db} CPU over threshold, all hosts")
    } else {
        format!("{db} CPU over threshold, {hosts} host(s)")
    }
}

/// Fill the fields every backend sets the same way.
pub(crate) fn fill_common(
    query: &mut Query,
    label: String,
    description_time: Option<String>,
    hosts: &[String],
) {
    let description = match description_time {
        Some(t) => format!("{label}: {t}"),
        None => label.clone(),
    };
    query.set_human_label(label);
    query.set_human_description(description);
    query.set_affinity_key(match hosts {
        [host] => Some(host.clone()),
        _ => None,
    });
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn metrics_slice() {
        assert_eq!(cpu_metrics_slice(1).unwrap(), &["usage_user"]);
        assert_eq!(cpu_metrics_slice(10).unwrap(), CPU_METRICS);
        assert_eq!(
            cpu_metrics_slice(0).unwrap_err().to_string(),
            "cannot get 0 metrics"
        );
        assert_eq!(
            cpu_metrics_slice(11).unwrap_err().to_string(),
            "too many metrics asked for"
        );
    }

    #[test]
    fn labels() {
        assert_eq!(
            single_groupby_label("TimescaleDB", 5, 8, Duration::from_secs(12 * 3600)),
            "TimescaleDB 5 cpu metric(s), random    8 hosts, random 12h by 1m"
        );
        assert_eq!(
            double_groupby_label("SiriDB", 10),
            "SiriDB mean of 10 metrics, all hosts, random 12h by 1h"
        );
        assert_eq!(
            max_all_label("TimescaleDB", 1, MAX_ALL_DURATION),
            "TimescaleDB max of all CPU metrics, random    1 hosts, random 8h by 1h"
        );
        assert_eq!(high_cpu_label("X", 0), "X CPU over threshold, all hosts");
        assert_eq!(high_cpu_label("X", 1), "X CPU over threshold, 1 host(s)");
    }

    #[test]
    fn affinity_only_for_single_host_queries() {
        let mut q = Query::default();
        fill_common(&mut q, "a".to_string(), None, &["host_1".to_string()]);
        assert_eq!(q.affinity_key(), Some("host_1"));
        assert_eq!(q.human_description(), "a");

        fill_common(
            &mut q,
            "b".to_string(),
            Some("2016-01-01T00:00:00Z".to_string()),
            &["host_1".to_string(), "host_2".to_string()],
        );
        assert_eq!(q.affinity_key(), None);
        assert_eq!(q.human_description(), "b: 2016-01-01T00:00:00Z");
    }

    #[test]
    fn core_window_and_hosts() {
        let interval = TimeInterval::new(
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 2, 0, 0, 0).unwrap(),
        )
        .unwrap();
        let mut core = DevopsCore::new(interval, 4, 11);

        let window = core.random_window(DOUBLE_GROUPBY_DURATION).unwrap();
        assert_eq!(window.duration(), DOUBLE_GROUPBY_DURATION);
        assert!(core.random_window(Duration::from_secs(48 * 3600)).is_err());

        assert_eq!(core.random_hosts(4).unwrap().len(), 4);
        let err = core.random_hosts(5).unwrap_err();
        assert_eq!(
            err.to_string(),
            "number of hosts (5) larger than total hosts. See --scale (4)"
        );
    }
}
