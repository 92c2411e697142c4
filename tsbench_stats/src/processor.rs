use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    ALL_QUERIES, COLD_QUERIES, Error, GroupSummary, Result, Stat, StatGroup, WARM_QUERIES, report,
};

/// Where the aggregator is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Collecting,
    Reporting,
    Finalizing,
    Done,
}

#[derive(Debug, Clone)]
pub struct StatProcessorConfig {
    /// Number of workers feeding the processor, for reports only
    pub workers: usize,
    /// The number of queries the run is limited to, `0` for no limit
    pub limit: u64,
    /// Number of leading queries to leave out of the statistics
    pub burn_in: u64,
    /// Emit an interim report every this many queries, `0` to disable
    pub print_interval: u64,
    /// Emit an interim report whenever this much time passed since the last one
    pub reporting_period: Option<Duration>,
    /// Track cold and warm runs in their own groups
    pub prewarm_queries: bool,
    /// Percentiles (0-100) shown for every group
    pub percentiles: Vec<f64>,
    /// Write the percentile ladder of all queries here once the run completes
    pub hdr_latencies_file: Option<PathBuf>,
}

impl Default for StatProcessorConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            limit: 0,
            burn_in: 0,
            print_interval: 0,
            reporting_period: None,
            prewarm_queries: false,
            percentiles: vec![50.0, 90.0, 95.0, 99.0],
            hdr_latencies_file: None,
        }
    }
}

/// The result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Queries processed, including burn-in
    pub queries: u64,
    /// Queries left out of the statistics
    pub burned_in: u64,
    pub workers: usize,
    pub wall_clock_secs: f64,
    pub overall_rate: f64,
    pub groups: BTreeMap<String, GroupSummary>,
}

impl RunSummary {
    pub fn group(&self, label: &str) -> Option<&GroupSummary> {
        self.groups.get(label)
    }
}

/// Aggregates the latency observations of a run.
///
/// Workers send every observation for one query as a single batch: the cold run, then the warm
/// run when prewarming. The processor is the only consumer of that channel, so its groups are
/// updated without any locking.
#[derive(Debug)]
pub struct StatProcessor {
    config: StatProcessorConfig,
    state: ProcessorState,
    groups: BTreeMap<String, StatGroup>,
    /// Counted observations seen so far, burn-in included
    queries: u64,
    burned_in: u64,
    started: Instant,
    last_report: Instant,
    last_report_queries: u64,
}

impl StatProcessor {
    pub fn new(config: StatProcessorConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            state: ProcessorState::Idle,
            groups: BTreeMap::new(),
            queries: 0,
            burned_in: 0,
            started: now,
            last_report: now,
            last_report_queries: 0,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Consume batches until every sender is dropped, writing interim reports to `interim` and
    /// the final report to `summary`.
    pub async fn process<I, F>(
        &mut self,
        mut rx: mpsc::Receiver<Vec<Stat>>,
        mut interim: I,
        mut summary: F,
    ) -> Result<RunSummary>
    where
        I: Write + Send,
        F: Write + Send,
    {
        self.started = Instant::now();
        self.last_report = self.started;
        self.set_state(ProcessorState::Collecting);

        let mut ticker = self.config.reporting_period.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                batch = rx.recv() => match batch {
                    Some(batch) => self.handle_batch(batch, &mut interim)?,
                    None => break,
                },
                _ = tick(&mut ticker) => {
                    if self.queries > self.last_report_queries
                        && self.burned_in >= self.config.burn_in
                    {
                        self.interim_report(&mut interim)?;
                    }
                }
            }
        }

        self.finish(&mut summary)
    }

    /// Fold one query's observations into the statistics
    pub fn handle_batch<W: Write>(&mut self, batch: Vec<Stat>, interim: &mut W) -> Result<()> {
        let counted = batch.iter().filter(|s| s.is_counted()).count() as u64;

        if self.burned_in < self.config.burn_in {
            self.burned_in += counted;
            self.queries += counted;
            if self.burned_in >= self.config.burn_in {
                self.last_report = Instant::now();
                self.last_report_queries = self.queries;
                writeln!(
                    interim,
                    "burn-in complete after {} queries with {} workers",
                    self.burned_in, self.config.workers
                )
                .map_err(Error::Report)?;
                info!(burned_in = self.burned_in, "burn-in complete");
            }
            return Ok(());
        }

        for stat in &batch {
            self.push(&stat.label, stat.value)?;
            self.push(ALL_QUERIES, stat.value)?;
            if self.config.prewarm_queries {
                let group = if stat.is_warm { WARM_QUERIES } else { COLD_QUERIES };
                self.push(group, stat.value)?;
            }

            if stat.is_counted() {
                self.queries += 1;
                let interval = self.config.print_interval;
                if interval > 0
                    && self.queries % interval == 0
                    && (self.config.limit == 0 || self.queries < self.config.limit)
                {
                    self.interim_report(interim)?;
                }
            }
        }
        Ok(())
    }

    /// Number of queries counted so far, burn-in included
    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn group(&self, label: &str) -> Option<&StatGroup> {
        self.groups.get(label)
    }

    fn push(&mut self, label: &str, value: f64) -> Result<()> {
        match self.groups.get_mut(label) {
            Some(group) => group.push(value),
            None => {
                let mut group = StatGroup::new()?;
                group.push(value);
                self.groups.insert(label.to_string(), group);
            }
        }
        Ok(())
    }

    fn interim_report<W: Write>(&mut self, w: &mut W) -> Result<()> {
        self.set_state(ProcessorState::Reporting);

        let now = Instant::now();
        let interval_rate = report::rate(
            self.queries - self.last_report_queries,
            now - self.last_report,
        );
        let overall_rate = report::rate(self.queries, now - self.started);

        report::write_interim_header(
            w,
            self.queries,
            self.config.workers,
            interval_rate,
            overall_rate,
        )
        .and_then(|_| report::write_groups(w, &self.groups, &self.config.percentiles))
        .and_then(|_| w.flush())
        .map_err(Error::Report)?;

        self.last_report = now;
        self.last_report_queries = self.queries;
        self.set_state(ProcessorState::Collecting);
        Ok(())
    }

    fn finish<W: Write>(&mut self, w: &mut W) -> Result<RunSummary> {
        self.set_state(ProcessorState::Finalizing);

        let wall_clock = self.started.elapsed();
        let overall_rate = report::rate(self.queries, wall_clock);

        report::write_final_header(w, self.queries, self.config.workers, overall_rate)
            .and_then(|_| report::write_groups(w, &self.groups, &self.config.percentiles))
            .and_then(|_| {
                writeln!(w, "Wall clock time: {:.6}sec", wall_clock.as_secs_f64())
            })
            .and_then(|_| w.flush())
            .map_err(Error::Report)?;

        if let Some(path) = &self.config.hdr_latencies_file {
            self.write_hdr_latencies(path)?;
        }

        let summary = RunSummary {
            queries: self.queries,
            burned_in: self.burned_in,
            workers: self.config.workers,
            wall_clock_secs: wall_clock.as_secs_f64(),
            overall_rate,
            groups: self
                .groups
                .iter()
                .map(|(label, group)| (label.clone(), group.summary(&self.config.percentiles)))
                .collect(),
        };

        self.set_state(ProcessorState::Done);
        Ok(summary)
    }

    fn write_hdr_latencies(&self, path: &Path) -> Result<()> {
        let to_error = |source| Error::HdrLatenciesFile {
            path: path.to_path_buf(),
            source,
        };

        let empty;
        let histogram = match self.groups.get(ALL_QUERIES) {
            Some(group) => group.histogram(),
            None => {
                empty = StatGroup::new()?;
                empty.histogram()
            }
        };

        let mut file = BufWriter::new(File::create(path).map_err(to_error)?);
        report::write_hdr_percentiles(&mut file, histogram)
            .and_then(|_| file.flush())
            .map_err(to_error)?;
        info!(path = %path.display(), "wrote HDR latencies");
        Ok(())
    }

    fn set_state(&mut self, state: ProcessorState) {
        debug!(from = ?self.state, to = ?state, "stat processor state change");
        self.state = state;
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
