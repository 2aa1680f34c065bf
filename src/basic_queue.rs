//! The basic queue: bounded buffer + flush scheduler + retry engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::buffer::Buffer;
use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::retry::{retry_submit, RetryOutcome};
use crate::stats::{QueueStats, QueueStatsSnapshot};
use crate::submitter::Submitter;

/// A basic (non-pooled) ingestion queue: one buffer, one flush scheduler, one
/// retry engine, exactly one Submit in flight at a time.
pub struct BasicQueue {
    buffer: Arc<Buffer>,
    stats: Arc<QueueStats>,
    config: Arc<QueueConfig>,
    closed: Arc<AtomicBool>,
    flush_tx: mpsc::Sender<()>,
    shutdown_tx: watch::Sender<bool>,
    worker: AsyncMutex<Option<JoinHandle<()>>>,
}

impl BasicQueue {
    pub fn new(submitter: Arc<dyn Submitter>, config: QueueConfig) -> Self {
        let buffer = Arc::new(Buffer::new(config.max_queue_size));
        let stats = Arc::new(QueueStats::new(config.max_queue_size));
        let config = Arc::new(config);
        let closed = Arc::new(AtomicBool::new(false));
        let (flush_tx, flush_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = tokio::spawn(run_scheduler(
            buffer.clone(),
            submitter,
            config.clone(),
            stats.clone(),
            flush_rx,
            shutdown_rx,
        ));

        tracing::info!(
            flush_at = config.flush_at,
            max_queue_size = config.max_queue_size,
            "basic queue started"
        );

        Self {
            buffer,
            stats,
            config,
            closed,
            flush_tx,
            shutdown_tx,
            worker: AsyncMutex::new(Some(worker)),
        }
    }

    /// Append `event`. Fails synchronously on validation failure or if the
    /// queue has been closed; all delivery failures after that point surface
    /// only through hooks and statistics.
    pub async fn enqueue(&self, event: Event) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        event.validate()?;

        if let Some(dropped) = self.buffer.push(event).await {
            self.stats.record_dropped(1);
            self.config.hooks.event_drop(&dropped.event, dropped.reason);
        }
        self.stats.record_enqueued(1);

        let size = self.buffer.len().await;
        self.stats.set_queue_size(size);
        if size >= self.config.flush_at {
            let _ = self.flush_tx.try_send(());
        }
        Ok(())
    }

    /// Signal a manual flush. Best-effort: the signal is coalesced with any
    /// pending size/time trigger and this call does not wait for the flush
    /// to complete, only for the background worker to have had a chance to
    /// observe it. Langfuse's own SDKs document `flush` the same way: a
    /// best-effort nudge, not a synchronous drain.
    pub async fn flush(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let _ = self.flush_tx.try_send(());
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }

    pub async fn size(&self) -> usize {
        self.buffer.len().await
    }

    pub async fn is_empty(&self) -> bool {
        self.buffer.is_empty().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }

    /// Mark the queue closed, trigger one final flush, and wait for it to
    /// complete (subject to `timeout`). Idempotent. A zero timeout is
    /// treated as an already-expired deadline: it returns immediately
    /// without signalling the worker or allowing a final Submit.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        if timeout.is_zero() {
            return Err(Error::Configuration(
                "shutdown deadline already expired".into(),
            ));
        }

        self.closed.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(true);

        let handle = self.worker.lock().await.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                tracing::info!("basic queue shutdown complete");
                Ok(())
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "flush worker terminated unexpectedly");
                Ok(())
            }
            Err(_elapsed) => {
                let remaining = self.buffer.copy_out().await;
                for event in &remaining {
                    self.stats.record_dropped(1);
                    self.config.hooks.event_drop(event, "shutdown_timeout");
                }
                Err(Error::Configuration("shutdown timed out".into()))
            }
        }
    }
}

async fn run_scheduler(
    buffer: Arc<Buffer>,
    submitter: Arc<dyn Submitter>,
    config: Arc<QueueConfig>,
    stats: Arc<QueueStats>,
    mut flush_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                do_flush(&buffer, submitter.as_ref(), &config, &stats, &shutdown_rx).await;
            }
            Some(()) = flush_rx.recv() => {
                do_flush(&buffer, submitter.as_ref(), &config, &stats, &shutdown_rx).await;
            }
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    do_flush(&buffer, submitter.as_ref(), &config, &stats, &shutdown_rx).await;
                    break;
                }
            }
        }
    }
}

async fn do_flush(
    buffer: &Buffer,
    submitter: &dyn Submitter,
    config: &QueueConfig,
    stats: &QueueStats,
    shutdown_rx: &watch::Receiver<bool>,
) {
    let events = buffer.copy_out().await;
    stats.set_queue_size(0);
    if events.is_empty() {
        return;
    }

    config.hooks.flush_start(events.len());
    let start = Instant::now();
    let mut retry_shutdown_rx = shutdown_rx.clone();
    let outcome = retry_submit(
        submitter,
        &events,
        config.max_retries,
        config.retry_backoff,
        &mut retry_shutdown_rx,
    )
    .await;
    stats.record_flush_time(start.elapsed());

    match outcome {
        RetryOutcome::Success => {
            stats.record_processed(events.len() as u64);
            stats.record_batch_submitted();
            config.hooks.flush_end(events.len(), true, None);
        }
        RetryOutcome::PartialFailure { processed, failed } => {
            stats.record_processed(processed as u64);
            stats.record_failed(failed.len() as u64);
            stats.record_batch_submitted();
            for f in &failed {
                if let Some(event) = events.iter().find(|e| e.id == f.event_id) {
                    config
                        .hooks
                        .event_drop(event, &format!("ingestion_error: {}", f.message));
                }
            }
            config.hooks.flush_end(events.len(), false, Some("partial failure"));
        }
        RetryOutcome::Exhausted => {
            stats.record_failed(events.len() as u64);
            stats.record_batch_failed();
            for event in &events {
                config.hooks.event_drop(event, "max_retries_exceeded");
            }
            config
                .hooks
                .flush_end(events.len(), false, Some("max retries exceeded"));
        }
        RetryOutcome::ShutdownAborted => {
            for event in &events {
                stats.record_dropped(1);
                config.hooks.event_drop(event, "shutdown_timeout");
            }
            config
                .hooks
                .flush_end(events.len(), false, Some("shutdown aborted"));
        }
    }
}
