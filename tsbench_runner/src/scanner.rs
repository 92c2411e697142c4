//! Reads the query stream and hands queries to workers.

use std::io::Read;

use tracing::{debug, info};
use tsbench_query::{Query, stream::QueryReader};
use twox_hash::XxHash64;

use crate::Result;

/// Seed of the affinity key hash. Fixed so a query file always maps to the same workers.
const AFFINITY_HASH_SEED: u64 = 0;

/// Distributes queries over workers.
#[derive(Debug)]
pub(crate) enum Router {
    /// One channel all workers pull from
    Shared(flume::Sender<Query>),
    /// One channel per worker, keyed queries always go to the same worker
    Hashed {
        senders: Vec<flume::Sender<Query>>,
        next: usize,
    },
}

impl Router {
    /// Create a router for `workers` workers and the receiving end for each of them
    pub(crate) fn new(workers: usize, hash_workers: bool) -> (Self, Vec<flume::Receiver<Query>>) {
        if hash_workers {
            let (senders, receivers) = (0..workers).map(|_| flume::bounded(1)).unzip();
            (Self::Hashed { senders, next: 0 }, receivers)
        } else {
            let (sender, receiver) = flume::bounded(workers);
            (Self::Shared(sender), vec![receiver; workers])
        }
    }

    /// Blocks until a worker has room for `query`. Returns false once the receiving workers are
    /// gone.
    pub(crate) fn route(&mut self, query: Query) -> bool {
        match self {
            Self::Shared(sender) => sender.send(query).is_ok(),
            Self::Hashed { senders, next } => {
                let worker = match query.affinity_key() {
                    Some(key) => worker_for_key(key, senders.len()),
                    None => {
                        let worker = *next;
                        *next = (*next + 1) % senders.len();
                        worker
                    }
                };
                senders[worker].send(query).is_ok()
            }
        }
    }
}

pub(crate) fn worker_for_key(key: &str, workers: usize) -> usize {
    (XxHash64::oneshot(AFFINITY_HASH_SEED, key.as_bytes()) % workers as u64) as usize
}

/// Decode queries from `reader`, assign IDs in scan order and route them, stopping after `limit`
/// queries unless `limit` is 0. Returns the number of queries handed out.
///
/// Meant to run on a blocking thread: decoding and routing both block.
pub(crate) fn scan<R: Read>(
    mut reader: QueryReader<R>,
    limit: u64,
    mut router: Router,
) -> Result<u64> {
    let mut scanned = 0;
    while limit == 0 || scanned < limit {
        let Some(mut query) = reader.next_query()? else {
            break;
        };
        query.set_id(scanned);
        if !router.route(query) {
            debug!(scanned, "no worker left to take queries, stopping scan");
            break;
        }
        scanned += 1;
    }
    info!(scanned, "query scan complete");
    Ok(scanned)
}
