//! Queue statistics.
//!
//! Counters are monotonic atomics; timing lives behind a small mutex since it
//! needs a read-modify-write of two related fields together. `snapshot()`
//! returns a plain value type so callers can never observe a half-updated
//! state and can never mutate the live counters through the snapshot.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QueueStatsSnapshot {
    pub events_queued: u64,
    pub events_processed: u64,
    pub events_failed: u64,
    pub events_dropped: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
    pub total_flush_time: Duration,
    pub average_flush_time: Duration,
    pub last_flush_time: Option<Duration>,
    pub queue_size: usize,
    pub max_queue_size: usize,
}

#[derive(Debug, Default)]
struct Timing {
    total_flush_time: Duration,
    last_flush_time: Option<Duration>,
}

/// Live, shared statistics for a single basic queue or worker pool.
#[derive(Debug, Default)]
pub struct QueueStats {
    events_queued: AtomicU64,
    events_processed: AtomicU64,
    events_failed: AtomicU64,
    events_dropped: AtomicU64,
    batches_submitted: AtomicU64,
    batches_failed: AtomicU64,
    queue_size: AtomicUsize,
    max_queue_size: AtomicUsize,
    timing: Mutex<Timing>,
}

impl QueueStats {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            max_queue_size: AtomicUsize::new(max_queue_size),
            ..Default::default()
        }
    }

    pub fn record_enqueued(&self, n: u64) {
        self.events_queued.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, n: u64) {
        self.events_dropped.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_processed(&self, n: u64) {
        self.events_processed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_failed(&self, n: u64) {
        self.events_failed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_batch_submitted(&self) {
        self.batches_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_queue_size(&self, size: usize) {
        self.queue_size.store(size, Ordering::Relaxed);
    }

    pub fn record_flush_time(&self, elapsed: Duration) {
        let mut timing = self.timing.lock().expect("stats mutex poisoned");
        timing.total_flush_time += elapsed;
        timing.last_flush_time = Some(elapsed);
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        let timing = self.timing.lock().expect("stats mutex poisoned");
        let batches_submitted = self.batches_submitted.load(Ordering::Relaxed);
        let average_flush_time = if batches_submitted > 0 {
            timing.total_flush_time / batches_submitted as u32
        } else {
            Duration::ZERO
        };
        QueueStatsSnapshot {
            events_queued: self.events_queued.load(Ordering::Relaxed),
            events_processed: self.events_processed.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            batches_submitted,
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            total_flush_time: timing.total_flush_time,
            average_flush_time,
            last_flush_time: timing.last_flush_time,
            queue_size: self.queue_size.load(Ordering::Relaxed),
            max_queue_size: self.max_queue_size.load(Ordering::Relaxed),
        }
    }

    /// Test-only: reset every counter to zero.
    #[cfg(test)]
    pub fn reset(&self) {
        self.events_queued.store(0, Ordering::Relaxed);
        self.events_processed.store(0, Ordering::Relaxed);
        self.events_failed.store(0, Ordering::Relaxed);
        self.events_dropped.store(0, Ordering::Relaxed);
        self.batches_submitted.store(0, Ordering::Relaxed);
        self.batches_failed.store(0, Ordering::Relaxed);
        self.queue_size.store(0, Ordering::Relaxed);
        *self.timing.lock().expect("stats mutex poisoned") = Timing::default();
    }
}

/// Statistics specific to the worker pool.
#[derive(Debug, Default)]
pub struct PoolStats {
    pub work_items_processed: AtomicU64,
    pub work_items_failed: AtomicU64,
    pub worker_panics: AtomicU64,
    total_processing_time: Mutex<Duration>,
    last_processed_time: Mutex<Option<Duration>>,
    per_worker_counts: Mutex<Vec<u64>>,
}

#[derive(Debug, Clone, Default)]
pub struct PoolStatsSnapshot {
    pub work_items_processed: u64,
    pub work_items_failed: u64,
    pub worker_panics: u64,
    pub total_processing_time: Duration,
    pub average_processing_time: Duration,
    pub last_processed_time: Option<Duration>,
    pub per_worker_counts: Vec<u64>,
}

impl PoolStats {
    pub fn new(num_workers: usize) -> Self {
        Self {
            per_worker_counts: Mutex::new(vec![0; num_workers]),
            ..Default::default()
        }
    }

    pub fn record_result(&self, worker_id: usize, success: bool, processing_time: Duration) {
        if success {
            self.work_items_processed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.work_items_failed.fetch_add(1, Ordering::Relaxed);
        }
        *self.total_processing_time.lock().expect("poisoned") += processing_time;
        *self.last_processed_time.lock().expect("poisoned") = Some(processing_time);
        let mut counts = self.per_worker_counts.lock().expect("poisoned");
        if let Some(c) = counts.get_mut(worker_id) {
            *c += 1;
        }
    }

    pub fn record_panic(&self) {
        self.worker_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolStatsSnapshot {
        let processed = self.work_items_processed.load(Ordering::Relaxed);
        let failed = self.work_items_failed.load(Ordering::Relaxed);
        let total = processed + failed;
        let total_processing_time = *self.total_processing_time.lock().expect("poisoned");
        let average_processing_time = if total > 0 {
            total_processing_time / total as u32
        } else {
            Duration::ZERO
        };
        PoolStatsSnapshot {
            work_items_processed: processed,
            work_items_failed: failed,
            worker_panics: self.worker_panics.load(Ordering::Relaxed),
            total_processing_time,
            average_processing_time,
            last_processed_time: *self.last_processed_time.lock().expect("poisoned"),
            per_worker_counts: self.per_worker_counts.lock().expect("poisoned").clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_a_value_copy() {
        let stats = QueueStats::new(100);
        stats.record_enqueued(5);
        let mut snap = stats.snapshot();
        snap.events_queued = 999;
        assert_eq!(stats.snapshot().events_queued, 5);
    }

    #[test]
    fn average_flush_time_divides_by_batches_submitted() {
        let stats = QueueStats::new(10);
        stats.record_flush_time(Duration::from_millis(100));
        stats.record_batch_submitted();
        stats.record_flush_time(Duration::from_millis(300));
        stats.record_batch_submitted();
        let snap = stats.snapshot();
        assert_eq!(snap.average_flush_time, Duration::from_millis(200));
    }
}
