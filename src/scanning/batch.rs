//! Batched dispatch with pacing between batches

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

use crate::config::ScanSettings;

/// Runs work in fixed-size concurrent batches.
///
/// Every item of a batch is dispatched at once; the next batch starts only
/// after the whole batch settled and the inter-batch delay elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRunner {
    batch_size: usize,
    inter_batch_delay: Duration,
}

impl BatchRunner {
    /// A `batch_size` of zero behaves like one
    pub fn new(batch_size: usize, inter_batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            inter_batch_delay,
        }
    }

    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self::new(settings.batch_size, settings.inter_batch_delay)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn inter_batch_delay(&self) -> Duration {
        self.inter_batch_delay
    }

    /// Apply `worker` to every item, returning results in input order.
    ///
    /// The worker is called exactly once per item. Failures are whatever the
    /// worker returns for that slot; nothing is retried here.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, mut worker: F) -> Vec<R>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut remaining = items.into_iter().peekable();
        let mut batch_number = 0usize;

        while remaining.peek().is_some() {
            batch_number += 1;
            let batch: Vec<Fut> = remaining
                .by_ref()
                .take(self.batch_size)
                .map(&mut worker)
                .collect();

            trace!(batch = batch_number, size = batch.len(), total, "Dispatching batch");
            results.extend(join_all(batch).await);

            if remaining.peek().is_some() && !self.inter_batch_delay.is_zero() {
                sleep(self.inter_batch_delay).await;
            }
        }

        results
    }
}
