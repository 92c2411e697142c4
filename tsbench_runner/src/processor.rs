//! The executor side of a benchmark run.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use tracing::debug;
use tsbench_query::Query;
use tsbench_stats::Stat;

/// Executes queries against a system under test.
///
/// Every worker owns one processor, so implementations need no internal synchronization.
#[async_trait]
pub trait QueryProcessor: Debug + Send {
    /// Called once by the owning worker before it takes any query
    async fn init(&mut self, worker_number: usize) -> anyhow::Result<()> {
        let _ = worker_number;
        Ok(())
    }

    /// Execute `query`, returning the latencies observed.
    ///
    /// An empty result makes the worker record the wall clock time of this call under the
    /// query's label. An error aborts the whole run.
    async fn process_query(&mut self, query: &Query, is_warm: bool) -> anyhow::Result<Vec<Stat>>;
}

/// Executes nothing, optionally sleeping to simulate a server.
///
/// Useful to measure the overhead of the benchmark itself and to check query files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessor {
    worker_number: usize,
    simulated_latency: Option<Duration>,
    debug: u8,
    print_responses: bool,
}

impl NoopProcessor {
    pub fn new(simulated_latency: Option<Duration>, debug: u8, print_responses: bool) -> Self {
        Self {
            worker_number: 0,
            simulated_latency,
            debug,
            print_responses,
        }
    }
}

#[async_trait]
impl QueryProcessor for NoopProcessor {
    async fn init(&mut self, worker_number: usize) -> anyhow::Result<()> {
        self.worker_number = worker_number;
        debug!(worker = worker_number, "noop processor ready");
        Ok(())
    }

    async fn process_query(&mut self, query: &Query, is_warm: bool) -> anyhow::Result<Vec<Stat>> {
        if self.debug >= 1 {
            println!("{query}");
        }

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        if self.print_responses {
            println!(
                "worker {}: query {} ({}): no response, noop processor",
                self.worker_number,
                query.id(),
                if is_warm { "warm" } else { "cold" }
            );
        }

        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn noop_sleeps_for_the_simulated_latency() {
        let mut processor = NoopProcessor::new(Some(Duration::from_millis(250)), 0, false);
        processor.init(3).await.unwrap();
        assert_eq!(processor.worker_number, 3);

        let start = tokio::time::Instant::now();
        let stats = processor
            .process_query(&Query::default(), false)
            .await
            .unwrap();
        assert!(stats.is_empty());
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn every_worker_gets_its_own_copy() {
        let template = NoopProcessor::new(None, 0, false);
        let mut first = template;
        let mut second = template;
        first.init(1).await.unwrap();
        second.init(2).await.unwrap();

        assert_eq!(template.worker_number, 0);
        assert_eq!(first.worker_number, 1);
        assert_eq!(second.worker_number, 2);
    }
}
