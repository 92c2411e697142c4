use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, trace};
use tsbench_query::Query;
use tsbench_stats::Stat;

use crate::{Error, QueryProcessor, Result};

/// One worker: pulls queries, runs them through its own processor and reports the latencies.
#[derive(Debug)]
pub(crate) struct Worker<P> {
    pub(crate) number: usize,
    pub(crate) processor: P,
    pub(crate) queries: flume::Receiver<Query>,
    pub(crate) stats: mpsc::Sender<Vec<Stat>>,
    pub(crate) prewarm_queries: bool,
}

impl<P: QueryProcessor> Worker<P> {
    pub(crate) async fn run(mut self) -> Result<u64> {
        self.processor
            .init(self.number)
            .await
            .map_err(|source| Error::ProcessorInit {
                worker: self.number,
                source,
            })?;

        let mut executed = 0;
        while let Ok(query) = self.queries.recv_async().await {
            trace!(
                worker = self.number,
                query_id = query.id(),
                "query received"
            );

            // cold strictly before warm, both in one batch
            let mut batch = self.execute(&query, false).await?;
            if self.prewarm_queries {
                batch.extend(self.execute(&query, true).await?);
            }
            executed += 1;

            if self.stats.send(batch).await.is_err() {
                debug!(worker = self.number, "stat processor gone, worker stopping");
                break;
            }
        }

        debug!(worker = self.number, executed, "worker done");
        Ok(executed)
    }

    async fn execute(&mut self, query: &Query, is_warm: bool) -> Result<Vec<Stat>> {
        let start = Instant::now();
        let stats = self
            .processor
            .process_query(query, is_warm)
            .await
            .map_err(|source| Error::Processor {
                worker: self.number,
                label: query.human_label().to_string(),
                source,
            })?;

        if stats.is_empty() {
            let millis = start.elapsed().as_secs_f64() * 1000.0;
            return Ok(vec![Stat::new(query.human_label(), millis).with_warm(is_warm)]);
        }

        Ok(stats.into_iter().map(|s| s.with_warm(is_warm)).collect())
    }
}
