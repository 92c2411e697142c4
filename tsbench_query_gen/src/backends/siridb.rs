use std::time::Duration;

use tsbench_query::{Payload, Query, SiriDbQuery};

use crate::devops::{
    self, DevopsCore, DevopsGenerator, DoubleGroupbyFiller, HighCpuFiller, LastPointFiller,
    MaxAllFiller, Result, SingleGroupbyFiller,
};

const NAME: &str = "SiriDB";

/// Devops queries in the SiriDB query language, where series are named after metrics and grouped
/// by host.
///
/// SiriDB has no way to express "top N buckets", so groupby-orderby-limit is not supported.
#[derive(Debug)]
pub struct SiriDbDevops {
    core: DevopsCore,
}

impl SiriDbDevops {
    pub fn new(core: DevopsCore) -> Self {
        Self { core }
    }

    fn fill(query: &mut Query, siriql: String) {
        *query.payload_mut() = Payload::SiriDb(SiriDbQuery { query: siriql });
    }
}

fn series_union<S: AsRef<str>>(names: &[S]) -> String {
    let quoted: Vec<_> = names.iter().map(|n| format!("`{}`", n.as_ref())).collect();
    format!("({})", quoted.join(" | "))
}

impl SingleGroupbyFiller for SiriDbDevops {
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

        let siriql = format!(
            "select max(1m) from {} & {} between '{}' and '{}'",
            series_union(metrics),
            series_union(&hostnames),
            interval.start_string(),
            interval.end_string(),
        );

        devops::fill_common(
            query,
            devops::single_groupby_label(NAME, metrics.len(), hosts, range),
            Some(interval.start_string()),
            &hostnames,
        );
        Self::fill(query, siriql);
        Ok(())
    }
}

impl DoubleGroupbyFiller for SiriDbDevops {
    fn group_by_time_and_primary_tag(&mut self, query: &mut Query, metrics: usize) -> Result<()> {
        let metrics = devops::cpu_metrics_slice(metrics)?;
        let interval = self.core.random_window(devops::DOUBLE_GROUPBY_DURATION)?;

        let siriql = format!(
            "select mean(1h) from {} between '{}' and '{}'",
            series_union(metrics),
            interval.start_string(),
            interval.end_string(),
        );

        devops::fill_common(
            query,
            devops::double_groupby_label(NAME, metrics.len()),
            Some(interval.start_string()),
            &[],
        );
        Self::fill(query, siriql);
        Ok(())
    }
}

impl MaxAllFiller for SiriDbDevops {
    fn max_all_cpu(&mut self, query: &mut Query, hosts: usize, range: Duration) -> Result<()> {
        let interval = self.core.random_window(range)?;
        let hostnames = self.core.random_hosts(hosts)?;

        let siriql = format!(
            "select max(1h) from {} & {} between '{}' and '{}'",
            series_union(devops::CPU_METRICS),
            series_union(&hostnames),
            interval.start_string(),
            interval.end_string(),
        );

        devops::fill_common(
            query,
            devops::max_all_label(NAME, hosts, range),
            Some(interval.start_string()),
            &hostnames,
        );
        Self::fill(query, siriql);
        Ok(())
    }
}

impl LastPointFiller for SiriDbDevops {
    fn last_point_per_host(&mut self, query: &mut Query) -> Result<()> {
        devops::fill_common(query, devops::last_point_label(NAME), None, &[]);
        Self::fill(
            query,
            format!("select last() from {}", series_union(devops::CPU_METRICS)),
        );
        Ok(())
    }
}

impl HighCpuFiller for SiriDbDevops {
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
            format!(" & {}", series_union(&hostnames))
        };

        let siriql = format!(
            "select filter(> 90) from `usage_user`{host_clause} between '{}' and '{}'",
            interval.start_string(),
            interval.end_string(),
        );

        devops::fill_common(
            query,
            devops::high_cpu_label(NAME, hosts),
            Some(interval.start_string()),
            &hostnames,
        );
        Self::fill(query, siriql);
        Ok(())
    }
}

impl DevopsGenerator for SiriDbDevops {
    fn name(&self) -> &'static str {
        "siridb"
    }

    fn generate_empty_query(&self) -> Query {
        Query::new(Payload::SiriDb(SiriDbQuery::default()))
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

    fn as_high_cpu(&mut self) -> Option<&mut dyn HighCpuFiller> {
        Some(self)
    }
}
