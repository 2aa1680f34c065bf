//! The composite front-end: buffered fast path backed by an optional worker
//! pool for load shedding under pressure.

use std::sync::Arc;
use std::time::Duration;

use crate::basic_queue::BasicQueue;
use crate::config::CompositeConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::pool::WorkerPool;
use crate::stats::{PoolStatsSnapshot, QueueStatsSnapshot};
use crate::submitter::Submitter;

/// Routes events between a [`BasicQueue`] and an optional [`WorkerPool`].
///
/// While the basic queue's buffered size stays at or below
/// `worker_pool_threshold`, events are enqueued onto it as usual and flushed
/// on the normal size/time triggers. Once the buffer backs up past the
/// threshold, new events are routed as single-event batches directly onto the
/// worker pool instead, so a slow submitter cannot unboundedly grow the
/// buffer.
pub struct IngestionQueue {
    basic: Arc<BasicQueue>,
    pool: Option<Arc<WorkerPool>>,
    worker_pool_threshold: usize,
}

impl IngestionQueue {
    pub fn new(submitter: Arc<dyn Submitter>, config: CompositeConfig) -> Self {
        let basic = Arc::new(BasicQueue::new(submitter.clone(), config.queue));
        let pool = config
            .pool
            .map(|pool_config| Arc::new(WorkerPool::new(submitter, pool_config)));
        Self {
            basic,
            pool,
            worker_pool_threshold: config.worker_pool_threshold,
        }
    }

    /// Enqueue `event`, routing to the worker pool when the buffered queue is
    /// over threshold and a pool is configured; otherwise append to the
    /// buffer as usual.
    pub async fn enqueue(&self, event: Event) -> Result<()> {
        if let Some(pool) = &self.pool {
            if self.basic.size().await > self.worker_pool_threshold {
                event.validate()?;
                return pool.submit_work(vec![event]);
            }
        }
        self.basic.enqueue(event).await
    }

    pub async fn flush(&self) -> Result<()> {
        self.basic.flush().await
    }

    pub async fn size(&self) -> usize {
        self.basic.size().await + self.pool.as_ref().map_or(0, |p| p.queue_size())
    }

    pub fn queue_stats(&self) -> QueueStatsSnapshot {
        self.basic.stats()
    }

    pub fn pool_stats(&self) -> Option<PoolStatsSnapshot> {
        self.pool.as_ref().map(|p| p.stats())
    }

    pub fn is_closed(&self) -> bool {
        self.basic.is_closed() || self.pool.as_ref().is_some_and(|p| p.is_shutting_down())
    }

    /// Shut down the worker pool first (it has nothing upstream relying on
    /// it), then the basic queue. Both deadlines share `timeout`; failures
    /// from either are combined rather than the first short-circuiting the
    /// second.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let pool_result = if let Some(pool) = &self.pool {
            pool.shutdown(timeout).await
        } else {
            Ok(())
        };
        let basic_result = self.basic.shutdown(timeout).await;

        match (pool_result, basic_result) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Err(pool_err), Err(basic_err)) => Err(Error::Configuration(format!(
                "composite shutdown failed: pool: {pool_err}; queue: {basic_err}"
            ))),
        }
    }
}
