//! Fan-out worker pool with bounded in-flight work, retry, and panic
//! recovery.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinSet;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::event::{BatchRequest, Envelope, Event};
use crate::stats::{PoolStats, PoolStatsSnapshot};
use crate::submitter::Submitter;

/// A pool-internal wrapper around a batch carrying retry bookkeeping.
#[derive(Clone)]
pub struct WorkItem {
    pub id: String,
    pub events: Vec<Event>,
    pub retries: u32,
    pub created_at: Instant,
    pub started_at: Option<Instant>,
}

/// What a worker observed after attempting to submit a [`WorkItem`].
pub struct WorkResult {
    pub item: WorkItem,
    pub success: bool,
    pub error: Option<String>,
    pub processing_time: Duration,
    pub worker_id: usize,
}

/// Bounded-concurrency batch processing pool.
pub struct WorkerPool {
    work_tx: mpsc::Sender<WorkItem>,
    stats: Arc<PoolStats>,
    config: Arc<PoolConfig>,
    closed: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    tasks: AsyncMutex<JoinSet<()>>,
}

impl WorkerPool {
    pub fn new(submitter: Arc<dyn Submitter>, config: PoolConfig) -> Self {
        let (work_tx, work_rx) = mpsc::channel(config.work_buffer_size);
        let (result_tx, result_rx) = mpsc::channel(config.work_buffer_size);
        let work_rx = Arc::new(AsyncMutex::new(work_rx));
        let stats = Arc::new(PoolStats::new(config.num_workers));
        let config = Arc::new(config);
        let closed = Arc::new(AtomicBool::new(false));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut tasks = JoinSet::new();
        for worker_id in 0..config.num_workers {
            tasks.spawn(supervise_worker(
                worker_id,
                work_rx.clone(),
                result_tx.clone(),
                submitter.clone(),
                stats.clone(),
                config.clone(),
                shutdown_rx.clone(),
            ));
        }
        drop(result_tx);
        tasks.spawn(result_processor(
            result_rx,
            work_tx.clone(),
            stats.clone(),
            config.clone(),
            shutdown_rx.clone(),
        ));

        tracing::info!(num_workers = config.num_workers, "worker pool started");

        Self {
            work_tx,
            stats,
            config,
            closed,
            shutdown_tx,
            tasks: AsyncMutex::new(tasks),
        }
    }

    /// Post a batch directly to the pool, bypassing the buffering queue.
    /// Non-blocking: fails with [`Error::Capacity`] if the work channel is
    /// full and [`Error::Closed`] if the pool is shutting down. Empty event
    /// lists are rejected.
    pub fn submit_work(&self, events: Vec<Event>) -> Result<()> {
        if events.is_empty() {
            return Err(Error::Validation(
                "work item must contain at least one event".into(),
            ));
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let item = WorkItem {
            id: uuid::Uuid::new_v4().to_string(),
            events,
            retries: 0,
            created_at: Instant::now(),
            started_at: None,
        };
        self.work_tx.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => Error::Capacity,
            mpsc::error::TrySendError::Closed(_) => Error::Closed,
        })
    }

    /// Number of items currently queued (not yet picked up by a worker).
    pub fn queue_size(&self) -> usize {
        self.config
            .work_buffer_size
            .saturating_sub(self.work_tx.capacity())
    }

    pub fn is_shutting_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting work, cancel in-flight retries, and wait for every
    /// worker and the result processor to drain, subject to `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        let mut tasks = self.tasks.lock().await;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    tracing::info!("worker pool shutdown complete");
                    return Ok(());
                }
                Err(_elapsed) => {
                    return Err(Error::Configuration("worker pool shutdown timed out".into()));
                }
            }
        }
    }
}

/// Run a worker, and if its task panics, respawn a fresh one bound to the
/// same id.
async fn supervise_worker(
    worker_id: usize,
    work_rx: Arc<AsyncMutex<mpsc::Receiver<WorkItem>>>,
    result_tx: mpsc::Sender<WorkResult>,
    submitter: Arc<dyn Submitter>,
    stats: Arc<PoolStats>,
    config: Arc<PoolConfig>,
    shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let handle = tokio::spawn(worker_loop(
            worker_id,
            work_rx.clone(),
            result_tx.clone(),
            submitter.clone(),
            config.clone(),
            shutdown_rx.clone(),
        ));
        match handle.await {
            Ok(()) => return,
            Err(join_err) if join_err.is_panic() => {
                stats.record_panic();
                let recovered = panic_message(join_err.into_panic());
                config.hooks.worker_panic(worker_id, &recovered);
            }
            Err(_cancelled) => return,
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked with a non-string payload".to_string()
    }
}

async fn worker_loop(
    worker_id: usize,
    work_rx: Arc<AsyncMutex<mpsc::Receiver<WorkItem>>>,
    result_tx: mpsc::Sender<WorkResult>,
    submitter: Arc<dyn Submitter>,
    config: Arc<PoolConfig>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let item = {
            let mut rx = work_rx.lock().await;
            tokio::select! {
                _ = shutdown_rx.changed() => None,
                maybe_item = rx.recv() => maybe_item,
            }
        };
        let Some(mut item) = item else {
            return;
        };

        item.started_at = Some(Instant::now());
        config.hooks.work_start(&item);
        let start = Instant::now();

        let envelopes: Vec<Envelope> = item.events.iter().map(Envelope::from).collect();
        let (success, error) = match BatchRequest::new(envelopes) {
            Ok(request) => match submitter.submit_batch(request).await {
                Ok(response) if response.is_full_success() => (true, None),
                Ok(response) => (
                    false,
                    Some(format!(
                        "batch reported failure: success={}, errors={}",
                        response.success,
                        response.errors.len()
                    )),
                ),
                Err(e) => (false, Some(e.to_string())),
            },
            Err(e) => (false, Some(e.to_string())),
        };

        let processing_time = start.elapsed();
        let result = WorkResult {
            item,
            success,
            error,
            processing_time,
            worker_id,
        };
        if result_tx.send(result).await.is_err() {
            return;
        }
    }
}

async fn result_processor(
    mut result_rx: mpsc::Receiver<WorkResult>,
    work_tx: mpsc::Sender<WorkItem>,
    stats: Arc<PoolStats>,
    config: Arc<PoolConfig>,
    shutdown_rx: watch::Receiver<bool>,
) {
    while let Some(result) = result_rx.recv().await {
        stats.record_result(result.worker_id, result.success, result.processing_time);

        if !result.success && result.item.retries < config.max_retries {
            let mut item = result.item.clone();
            item.retries += 1;
            let delay = config.retry_backoff * item.retries;
            let work_tx = work_tx.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        let _ = work_tx.send(item).await;
                    }
                    _ = shutdown_rx.changed() => {}
                }
            });
        }

        config.hooks.work_end(&result);
    }
}
