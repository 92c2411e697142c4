use std::{fmt::Display, time::Duration};

use tsbench_query::Query;

use super::{DevopsGenerator, Error, MAX_ALL_DURATION, Result};

/// The parameters of a devops query type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevopsQuery {
    SingleGroupby {
        metrics: usize,
        hosts: usize,
        hours: u64,
    },
    MaxAll {
        hosts: usize,
    },
    DoubleGroupby {
        metrics: usize,
    },
    /// `hosts == 0` means all hosts
    HighCpu {
        hosts: usize,
    },
    LastPoint,
    GroupbyOrderbyLimit,
}

/// A named entry in the query type registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryType {
    pub tag: &'static str,
    pub query: DevopsQuery,
}

const fn single_groupby(tag: &'static str, metrics: usize, hosts: usize, hours: u64) -> QueryType {
    QueryType {
        tag,
        query: DevopsQuery::SingleGroupby {
            metrics,
            hosts,
            hours,
        },
    }
}

/// Every devops query type, by tag
pub const QUERY_TYPES: &[QueryType] = &[
    single_groupby("single-groupby-1-1-1", 1, 1, 1),
    single_groupby("single-groupby-1-1-12", 1, 1, 12),
    single_groupby("single-groupby-1-8-1", 1, 8, 1),
    single_groupby("single-groupby-5-1-1", 5, 1, 1),
    single_groupby("single-groupby-5-1-12", 5, 1, 12),
    single_groupby("single-groupby-5-8-1", 5, 8, 1),
    QueryType {
        tag: "cpu-max-all-1",
        query: DevopsQuery::MaxAll { hosts: 1 },
    },
    QueryType {
        tag: "cpu-max-all-8",
        query: DevopsQuery::MaxAll { hosts: 8 },
    },
    QueryType {
        tag: "double-groupby-1",
        query: DevopsQuery::DoubleGroupby { metrics: 1 },
    },
    QueryType {
        tag: "double-groupby-5",
        query: DevopsQuery::DoubleGroupby { metrics: 5 },
    },
    QueryType {
        tag: "double-groupby-all",
        query: DevopsQuery::DoubleGroupby {
            metrics: super::CPU_METRICS.len(),
        },
    },
    QueryType {
        tag: "high-cpu-all",
        query: DevopsQuery::HighCpu { hosts: 0 },
    },
    QueryType {
        tag: "high-cpu-1",
        query: DevopsQuery::HighCpu { hosts: 1 },
    },
    QueryType {
        tag: "lastpoint",
        query: DevopsQuery::LastPoint,
    },
    QueryType {
        tag: "groupby-orderby-limit",
        query: DevopsQuery::GroupbyOrderbyLimit,
    },
];

impl DevopsQuery {
    /// Look a query type up by its tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        QUERY_TYPES
            .iter()
            .find(|t| t.tag == tag)
            .map(|t| t.query)
            .ok_or_else(|| Error::UnknownQueryType(tag.to_string()))
    }

    /// Name of the capability trait a backend needs for this query type
    pub fn capability(&self) -> &'static str {
        match self {
            Self::SingleGroupby { .. } => "SingleGroupbyFiller",
            Self::MaxAll { .. } => "MaxAllFiller",
            Self::DoubleGroupby { .. } => "DoubleGroupbyFiller",
            Self::HighCpu { .. } => "HighCpuFiller",
            Self::LastPoint => "LastPointFiller",
            Self::GroupbyOrderbyLimit => "GroupbyOrderbyLimitFiller",
        }
    }

    /// Whether `generator` can render this query type
    pub fn is_supported_by(&self, generator: &mut dyn DevopsGenerator) -> bool {
        match self {
            Self::SingleGroupby { .. } => generator.as_single_groupby().is_some(),
            Self::MaxAll { .. } => generator.as_max_all().is_some(),
            Self::DoubleGroupby { .. } => generator.as_double_groupby().is_some(),
            Self::HighCpu { .. } => generator.as_high_cpu().is_some(),
            Self::LastPoint => generator.as_last_point().is_some(),
            Self::GroupbyOrderbyLimit => generator.as_groupby_orderby_limit().is_some(),
        }
    }

    /// Fill `query` using the capability of `generator` this query type needs.
    ///
    /// Returns [`Error::UnsupportedQueryType`] when the backend lacks that capability.
    pub fn fill(&self, generator: &mut dyn DevopsGenerator, query: &mut Query) -> Result<()> {
        let unsupported = Error::UnsupportedQueryType {
            capability: self.capability(),
            backend: generator.name(),
        };

        match *self {
            Self::SingleGroupby {
                metrics,
                hosts,
                hours,
            } => generator
                .as_single_groupby()
                .ok_or(unsupported)?
                .group_by_time(query, hosts, metrics, Duration::from_secs(hours * 3600)),
            Self::MaxAll { hosts } => generator
                .as_max_all()
                .ok_or(unsupported)?
                .max_all_cpu(query, hosts, MAX_ALL_DURATION),
            Self::DoubleGroupby { metrics } => generator
                .as_double_groupby()
                .ok_or(unsupported)?
                .group_by_time_and_primary_tag(query, metrics),
            Self::HighCpu { hosts } => generator
                .as_high_cpu()
                .ok_or(unsupported)?
                .high_cpu_for_hosts(query, hosts),
            Self::LastPoint => generator
                .as_last_point()
                .ok_or(unsupported)?
                .last_point_per_host(query),
            Self::GroupbyOrderbyLimit => generator
                .as_groupby_orderby_limit()
                .ok_or(unsupported)?
                .group_by_order_by_limit(query),
        }
    }
}

impl Display for DevopsQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleGroupby {
                metrics,
                hosts,
                hours,
            } => write!(
                f,
                "max of {metrics} metric(s) by 1m for {hosts} host(s) over {hours}h"
            ),
            Self::MaxAll { hosts } => write!(
                f,
                "max of all CPU metrics by 1h for {hosts} host(s) over {}",
                humantime::format_duration(MAX_ALL_DURATION)
            ),
            Self::DoubleGroupby { metrics } => write!(
                f,
                "mean of {metrics} metric(s) by 1h and host for all hosts over {}",
                humantime::format_duration(super::DOUBLE_GROUPBY_DURATION)
            ),
            Self::HighCpu { hosts: 0 } => {
                write!(f, "readings with usage_user over 90 for all hosts")
            }
            Self::HighCpu { hosts } => {
                write!(f, "readings with usage_user over 90 for {hosts} host(s)")
            }
            Self::LastPoint => write!(f, "last reading of every host"),
            Self::GroupbyOrderbyLimit => write!(
                f,
                "last 5 one-minute buckets of max usage_user before a random time"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use tsbench_query::Payload;

    use super::*;
    use crate::devops::{LastPointFiller, fill_common, last_point_label};

    /// A backend that only knows the last point query
    #[derive(Debug, Default)]
    struct LastPointOnly {
        filled: usize,
    }

    impl LastPointFiller for LastPointOnly {
        fn last_point_per_host(&mut self, query: &mut Query) -> Result<()> {
            self.filled += 1;
            fill_common(query, last_point_label("Fake"), None, &[]);
            Ok(())
        }
    }

    impl DevopsGenerator for LastPointOnly {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn generate_empty_query(&self) -> Query {
            Query::new(Payload::Empty)
        }

        fn as_last_point(&mut self) -> Option<&mut dyn LastPointFiller> {
            Some(self)
        }
    }

    #[test]
    fn tags_are_unique() {
        let tags: HashSet<_> = QUERY_TYPES.iter().map(|t| t.tag).collect();
        assert_eq!(tags.len(), QUERY_TYPES.len());
        assert_eq!(QUERY_TYPES.len(), 15);
    }

    #[test]
    fn lookup() {
        assert_eq!(
            DevopsQuery::from_tag("single-groupby-5-8-1").unwrap(),
            DevopsQuery::SingleGroupby {
                metrics: 5,
                hosts: 8,
                hours: 1
            }
        );
        assert_eq!(
            DevopsQuery::from_tag("double-groupby-all").unwrap(),
            DevopsQuery::DoubleGroupby { metrics: 10 }
        );
        let err = DevopsQuery::from_tag("nope").unwrap_err();
        assert!(matches!(err, Error::UnknownQueryType(t) if t == "nope"));
    }

    #[test]
    fn descriptions_name_the_aggregate() {
        let single = DevopsQuery::from_tag("single-groupby-5-8-1").unwrap();
        assert_eq!(
            single.to_string(),
            "max of 5 metric(s) by 1m for 8 host(s) over 1h"
        );
        let double = DevopsQuery::from_tag("double-groupby-1").unwrap();
        let description = double.to_string();
        assert!(description.starts_with("mean of 1 metric(s) by 1h and host"));
    }

    #[test]
    fn dispatch_to_supported_capability() {
        let mut backend = LastPointOnly::default();
        let mut query = backend.generate_empty_query();

        DevopsQuery::LastPoint
            .fill(&mut backend, &mut query)
            .unwrap();
        assert_eq!(backend.filled, 1);
        assert_eq!(query.human_label(), "Fake last row per host");
        assert!(DevopsQuery::LastPoint.is_supported_by(&mut backend));
    }

    #[test]
    fn missing_capability_names_capability_and_backend() {
        let mut backend = LastPointOnly::default();
        let mut query = backend.generate_empty_query();

        let err = DevopsQuery::HighCpu { hosts: 1 }
            .fill(&mut backend, &mut query)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "backend fake does not implement HighCpuFiller"
        );
        assert!(!DevopsQuery::GroupbyOrderbyLimit.is_supported_by(&mut backend));
        assert_eq!(backend.filled, 0);
    }
}
