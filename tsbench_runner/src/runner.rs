use std::io::{Read, Write};

use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, info, warn};
use tsbench_query::stream::QueryReader;
use tsbench_stats::{RunSummary, StatProcessor};

use crate::{
    BenchmarkRunnerConfig, Error, QueryProcessor, Result, RunResults,
    scanner::{self, Router},
    worker::Worker,
};

/// Batches of latencies buffered between the workers and the stat processor
const STAT_CHANNEL_CAPACITY: usize = 10_000;

/// Where a [`BenchmarkRunner`] is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    /// Scanner and workers are busy
    Running,
    /// Every query has been handed out, workers are finishing theirs
    Draining,
    Done,
}

/// Runs one benchmark.
///
/// A run fails fast: the first error of the scanner, any worker or the stat processor aborts the
/// remaining workers and is returned.
#[derive(Debug)]
pub struct BenchmarkRunner {
    config: BenchmarkRunnerConfig,
    state: RunnerState,
}

impl BenchmarkRunner {
    pub fn new(config: BenchmarkRunnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: RunnerState::Created,
        })
    }

    pub fn config(&self) -> &BenchmarkRunnerConfig {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Execute the queries of `input` with one processor from `new_processor` per worker.
    ///
    /// Interim reports go to `interim`, the final report to `summary`.
    pub async fn run<R, P, F, I, S>(
        &mut self,
        input: R,
        mut new_processor: F,
        interim: I,
        summary: S,
    ) -> Result<RunSummary>
    where
        R: Read + Send + 'static,
        P: QueryProcessor + 'static,
        F: FnMut() -> P + Send,
        I: Write + Send,
        S: Write + Send,
    {
        // fail on a foreign file before starting anything
        let reader = QueryReader::new(input)?;

        let workers = self.config.workers;
        let limit = self.config.limit;
        let prewarm_queries = self.config.prewarm_queries;
        info!(
            workers,
            limit,
            burn_in = self.config.burn_in,
            prewarm_queries,
            hash_workers = self.config.hash_workers,
            "starting benchmark run"
        );

        let (router, receivers) = Router::new(workers, self.config.hash_workers);
        let (stat_tx, stat_rx) = mpsc::channel(STAT_CHANNEL_CAPACITY);
        let mut stat_processor = StatProcessor::new(self.config.stat_processor_config());

        transition(&mut self.state, RunnerState::Running);
        let scanner = tokio::task::spawn_blocking(move || scanner::scan(reader, limit, router));

        let mut worker_tasks = JoinSet::new();
        for (number, queries) in receivers.into_iter().enumerate() {
            let worker = Worker {
                number,
                processor: new_processor(),
                queries,
                stats: stat_tx.clone(),
                prewarm_queries,
            };
            worker_tasks.spawn(worker.run());
        }
        // the stat processor finishes once the last worker drops its sender
        drop(stat_tx);

        let state = &mut self.state;
        let scan = async move {
            let scanned = scanner.await.map_err(|source| Error::Task {
                task: "scanner",
                source,
            })??;
            transition(state, RunnerState::Draining);
            Ok::<_, Error>(scanned)
        };

        let drain = async {
            let mut executed = 0;
            while let Some(result) = worker_tasks.join_next().await {
                let result = result
                    .map_err(|source| Error::Task {
                        task: "worker",
                        source,
                    })
                    .and_then(|worker_result| worker_result);
                match result {
                    Ok(n) => executed += n,
                    Err(e) => {
                        warn!(error = %e, "aborting benchmark run");
                        worker_tasks.abort_all();
                        return Err(e);
                    }
                }
            }
            Ok(executed)
        };

        let stats = async {
            stat_processor
                .process(stat_rx, interim, summary)
                .await
                .map_err(Error::from)
        };

        let (scanned, executed, run_summary) = tokio::try_join!(scan, drain, stats)?;
        debug!(scanned, executed, "all workers finished");
        transition(&mut self.state, RunnerState::Done);

        if let Some(path) = &self.config.results_file {
            RunResults {
                config: &self.config,
                summary: &run_summary,
            }
            .write_to(path)?;
        }

        Ok(run_summary)
    }
}

fn transition(state: &mut RunnerState, to: RunnerState) {
    debug!(from = ?*state, ?to, "runner state change");
    *state = to;
}
