use std::time::Duration;

use chrono::{DateTime, Utc};
use tsbench_query::{Payload, Query, SqlQuery};

use crate::devops::{
    self, DevopsCore, DevopsGenerator, DoubleGroupbyFiller, GroupbyOrderbyLimitFiller,
    HighCpuFiller, LastPointFiller, MaxAllFiller, Result, SingleGroupbyFiller,
};

const NAME: &str = "TimescaleDB";
const HYPERTABLE: &str = "cpu";

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Minute,
    Hour,
}

/// Devops queries in PostgreSQL/TimescaleDB SQL against a `cpu` hypertable with a `hostname`
/// column.
#[derive(Debug)]
pub struct TimescaleDbDevops {
    core: DevopsCore,
    use_time_bucket: bool,
}

impl TimescaleDbDevops {
    pub fn new(core: DevopsCore, use_time_bucket: bool) -> Self {
        Self {
            core,
            use_time_bucket,
        }
    }

    fn time_bucket(&self, bucket: Bucket) -> &'static str {
        match (self.use_time_bucket, bucket) {
            (true, Bucket::Minute) => "time_bucket('60 seconds', time)",
            (true, Bucket::Hour) => "time_bucket('3600 seconds', time)",
            (false, Bucket::Minute) => "date_trunc('minute', time)",
            (false, Bucket::Hour) => "date_trunc('hour', time)",
        }
    }

    fn fill(&self, query: &mut Query, sql: String) {
        *query.payload_mut() = Payload::Sql(SqlQuery {
            hypertable: HYPERTABLE.to_string(),
            sql,
        });
    }
}

fn host_where(hosts: &[String]) -> String {
    let quoted: Vec<_> = hosts.iter().map(|h| format!("'{h}'")).collect();
    format!("hostname IN ({})", quoted.join(","))
}

fn agg_select(agg: &str, metrics: &[&str]) -> String {
    metrics
        .iter()
        .map(|m| format!("{agg}({m}) as {agg}_{m}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sql_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.f %z").to_string()
}

impl SingleGroupbyFiller for TimescaleDbDevops {
    fn group_by_time(
        &mut self,
        query: &mut Query,
        hosts: usize,
        metrics: usize,
        range: Duration,
    ) -> Result<()> {
        let interval = self.core.random_window(range)?;
        let metrics = devops::cpu_metrics_slice(metrics)?;
        let hostnames = self.core.random_hosts(hosts)?;

        let sql = format!(
            "SELECT {} AS minute,\n        {}\n        FROM cpu\n        WHERE {} AND time >= '{}' AND time < '{}'\n        GROUP BY minute ORDER BY minute ASC",
            self.time_bucket(Bucket::Minute),
            agg_select("max", metrics),
            host_where(&hostnames),
            sql_time(interval.start()),
            sql_time(interval.end()),
        );

        devops::fill_common(
            query,
            devops::single_groupby_label(NAME, metrics.len(), hosts, range),
            Some(interval.start_string()),
            &hostnames,
        );
        self.fill(query, sql);
        Ok(())
    }
}

impl DoubleGroupbyFiller for TimescaleDbDevops {
    fn group_by_time_and_primary_tag(&mut self, query: &mut Query, metrics: usize) -> Result<()> {
        let metrics = devops::cpu_metrics_slice(metrics)?;
        let interval = self.core.random_window(devops::DOUBLE_GROUPBY_DURATION)?;

        let mean_columns: Vec<_> = metrics.iter().map(|m| format!("mean_{m}")).collect();
        let select: Vec<_> = metrics
            .iter()
            .zip(&mean_columns)
            .map(|(m, mean)| format!("avg({m}) as {mean}"))
            .collect();

        let sql = format!(
            "WITH cpu_avg AS (\n          SELECT {} as hour, hostname,\n          {}\n          FROM cpu\n          WHERE time >= '{}' AND time < '{}'\n          GROUP BY 1, 2\n        )\n        SELECT hour, hostname, {}\n        FROM cpu_avg\n        ORDER BY hour, hostname",
            self.time_bucket(Bucket::Hour),
            select.join(", "),
            sql_time(interval.start()),
            sql_time(interval.end()),
            mean_columns.join(", "),
        );

        devops::fill_common(
            query,
            devops::double_groupby_label(NAME, metrics.len()),
            Some(interval.start_string()),
            &[],
        );
        self.fill(query, sql);
        Ok(())
    }
}

impl MaxAllFiller for TimescaleDbDevops {
    fn max_all_cpu(&mut self, query: &mut Query, hosts: usize, range: Duration) -> Result<()> {
        let interval = self.core.random_window(range)?;
        let hostnames = self.core.random_hosts(hosts)?;

        let sql = format!(
            "SELECT {} AS hour,\n        {}\n        FROM cpu\n        WHERE {} AND time >= '{}' AND time < '{}'\n        GROUP BY hour ORDER BY hour",
            self.time_bucket(Bucket::Hour),
            agg_select("max", devops::CPU_METRICS),
            host_where(&hostnames),
            sql_time(interval.start()),
            sql_time(interval.end()),
        );

        devops::fill_common(
            query,
            devops::max_all_label(NAME, hosts, range),
            Some(interval.start_string()),
            &hostnames,
        );
        self.fill(query, sql);
        Ok(())
    }
}

impl LastPointFiller for TimescaleDbDevops {
    fn last_point_per_host(&mut self, query: &mut Query) -> Result<()> {
        devops::fill_common(query, devops::last_point_label(NAME), None, &[]);
        self.fill(
            query,
            "SELECT DISTINCT ON (hostname) * FROM cpu ORDER BY hostname, time DESC".to_string(),
        );
        Ok(())
    }
}

impl GroupbyOrderbyLimitFiller for TimescaleDbDevops {
    fn group_by_order_by_limit(&mut self, query: &mut Query) -> Result<()> {
        let interval = self
            .core
            .random_window(devops::GROUPBY_ORDERBY_LIMIT_WINDOW)?;

        let sql = format!(
            "SELECT {} AS minute, max(usage_user)\n        FROM cpu\n        WHERE time < '{}'\n        GROUP BY minute\n        ORDER BY minute DESC\n        LIMIT 5",
            self.time_bucket(Bucket::Minute),
            sql_time(interval.end()),
        );

        devops::fill_common(
            query,
            devops::groupby_orderby_limit_label(NAME),
            Some(interval.end_string()),
            &[],
        );
        self.fill(query, sql);
        Ok(())
    }
}

impl HighCpuFiller for TimescaleDbDevops {
    fn high_cpu_for_hosts(&mut self, query: &mut Query, hosts: usize) -> Result<()> {
        let interval = self.core.random_window(devops::HIGH_CPU_DURATION)?;
        let hostnames = if hosts == 0 {
            vec![]
        } else {
            self.core.random_hosts(hosts)?
        };
        let host_clause = if hostnames.is_empty() {
            String::new()
        } else {
            format!(" AND {}", host_where(&hostnames))
        };

        let sql = format!(
            "SELECT * FROM cpu WHERE usage_user > 90.0 and time >= '{}' AND time < '{}'{host_clause}",
            sql_time(interval.start()),
            sql_time(interval.end()),
        );

        devops::fill_common(
            query,
            devops::high_cpu_label(NAME, hosts),
            Some(interval.start_string()),
            &hostnames,
        );
        self.fill(query, sql);
        Ok(())
    }
}

impl DevopsGenerator for TimescaleDbDevops {
    fn name(&self) -> &'static str {
        "timescaledb"
    }

    fn generate_empty_query(&self) -> Query {
        Query::new(Payload::Sql(SqlQuery::default()))
    }

    fn as_single_groupby(&mut self) -> Option<&mut dyn SingleGroupbyFiller> {
        Some(self)
    }

    fn as_double_groupby(&mut self) -> Option<&mut dyn DoubleGroupbyFiller> {
        Some(self)
    }

    fn as_max_all(&mut self) -> Option<&mut dyn MaxAllFiller> {
        Some(self)
    }

    fn as_last_point(&mut self) -> Option<&mut dyn LastPointFiller> {
        Some(self)
    }

    fn as_groupby_orderby_limit(&mut self) -> Option<&mut dyn GroupbyOrderbyLimitFiller> {
        Some(self)
    }

    fn as_high_cpu(&mut self) -> Option<&mut dyn HighCpuFiller> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{devops::DevopsQuery, interval::TimeInterval};

    fn generator(scale: usize, use_time_bucket: bool) -> TimescaleDbDevops {
        let interval = TimeInterval::new(
            Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 1, 12, 0, 0).unwrap(),
        )
        .unwrap();
        TimescaleDbDevops::new(DevopsCore::new(interval, scale, 1), use_time_bucket)
    }

    fn sql(query: &Query) -> &str {
        match query.payload() {
            Payload::Sql(sql) => &sql.sql,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn last_point() {
        let mut g = generator(1, false);
        let mut q = g.generate_empty_query();
        DevopsQuery::LastPoint.fill(&mut g, &mut q).unwrap();

        assert_eq!(q.human_label(), "TimescaleDB last row per host");
        assert_eq!(q.human_description(), "TimescaleDB last row per host");
        assert_eq!(
            sql(&q),
            "SELECT DISTINCT ON (hostname) * FROM cpu ORDER BY hostname, time DESC"
        );
    }

    #[test]
    fn double_groupby_covers_the_whole_range() {
        // a 12h window in a 12h range can only start at the beginning
        let mut g = generator(1, true);
        let mut q = g.generate_empty_query();
        DevopsQuery::DoubleGroupby { metrics: 2 }
            .fill(&mut g, &mut q)
            .unwrap();

        assert_eq!(
            q.human_label(),
            "TimescaleDB mean of 2 metrics, all hosts, random 12h by 1h"
        );
        assert_eq!(
            q.human_description(),
            "TimescaleDB mean of 2 metrics, all hosts, random 12h by 1h: 2016-01-01T00:00:00Z"
        );
        assert_eq!(
            sql(&q),
            "WITH cpu_avg AS (
          SELECT time_bucket('3600 seconds', time) as hour, hostname,
          avg(usage_user) as mean_usage_user, avg(usage_system) as mean_usage_system
          FROM cpu
          WHERE time >= '2016-01-01 00:00:00 +0000' AND time < '2016-01-01 12:00:00 +0000'
          GROUP BY 1, 2
        )
        SELECT hour, hostname, mean_usage_user, mean_usage_system
        FROM cpu_avg
        ORDER BY hour, hostname"
        );
        assert_eq!(q.affinity_key(), None);
    }

    #[test]
    fn single_groupby_single_host_sets_affinity() {
        let mut g = generator(1, false);
        let mut q = g.generate_empty_query();
        DevopsQuery::SingleGroupby {
            metrics: 1,
            hosts: 1,
            hours: 12,
        }
        .fill(&mut g, &mut q)
        .unwrap();

        assert_eq!(
            q.human_label(),
            "TimescaleDB 1 cpu metric(s), random    1 hosts, random 12h by 1m"
        );
        assert_eq!(q.affinity_key(), Some("host_0"));
        assert_eq!(
            sql(&q),
            "SELECT date_trunc('minute', time) AS minute,
        max(usage_user) as max_usage_user
        FROM cpu
        WHERE hostname IN ('host_0') AND time >= '2016-01-01 00:00:00 +0000' AND time < '2016-01-01 12:00:00 +0000'
        GROUP BY minute ORDER BY minute ASC"
        );
    }

    #[test]
    fn high_cpu_all_hosts_has_no_host_clause() {
        let mut g = generator(4, false);
        let mut q = g.generate_empty_query();
        DevopsQuery::HighCpu { hosts: 0 }.fill(&mut g, &mut q).unwrap();

        assert_eq!(q.human_label(), "TimescaleDB CPU over threshold, all hosts");
        assert!(!sql(&q).contains("hostname IN"));
    }

    #[test]
    fn max_all_needs_a_wide_enough_range() {
        let mut g = generator(8, false);
        let mut q = g.generate_empty_query();
        DevopsQuery::MaxAll { hosts: 8 }.fill(&mut g, &mut q).unwrap();
        assert!(sql(&q).contains("max(usage_guest_nice) as max_usage_guest_nice"));

        let mut too_many = g.generate_empty_query();
        let err = DevopsQuery::SingleGroupby {
            metrics: 1,
            hosts: 9,
            hours: 1,
        }
        .fill(&mut g, &mut too_many)
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "number of hosts (9) larger than total hosts. See --scale (8)"
        );
    }

    #[test]
    fn groupby_orderby_limit_uses_window_end() {
        let mut g = generator(1, false);
        let mut q = g.generate_empty_query();
        DevopsQuery::GroupbyOrderbyLimit
            .fill(&mut g, &mut q)
            .unwrap();

        assert_eq!(
            q.human_label(),
            "TimescaleDB max cpu over last 5 min-intervals (random end)"
        );
        assert!(sql(&q).ends_with("LIMIT 5"));
    }
}
