//! Observability callbacks.
//!
//! All extension points are function-valued configuration, not subclass
//! hooks. Hooks run synchronously on the flush/worker thread that calls
//! them — never on a dedicated hook thread — and must not mutate the
//! events/results passed to them. A slow hook blocks flush progress; that is
//! the caller's responsibility to keep cheap.

use std::sync::Arc;

use crate::event::Event;
use crate::pool::{WorkItem, WorkResult};

type HookFn<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Optional callbacks invoked from the basic queue's flush loop and the
/// worker pool's worker/result-processor loops.
#[derive(Clone, Default)]
pub struct Hooks {
    pub on_flush_start: Option<HookFn<usize>>,
    pub on_flush_end: Option<Arc<dyn Fn(usize, bool, Option<&str>) + Send + Sync>>,
    pub on_event_drop: Option<Arc<dyn Fn(&Event, &str) + Send + Sync>>,
    pub on_work_start: Option<Arc<dyn Fn(&WorkItem) + Send + Sync>>,
    pub on_work_end: Option<Arc<dyn Fn(&WorkResult) + Send + Sync>>,
    pub on_worker_panic: Option<Arc<dyn Fn(usize, &str) + Send + Sync>>,
}

impl Hooks {
    pub fn flush_start(&self, batch_size: usize) {
        if let Some(f) = &self.on_flush_start {
            f(batch_size);
        }
    }

    pub fn flush_end(&self, batch_size: usize, success: bool, err: Option<&str>) {
        if let Some(f) = &self.on_flush_end {
            f(batch_size, success, err);
        }
    }

    pub fn event_drop(&self, event: &Event, reason: &str) {
        tracing::warn!(event_id = %event.id, reason, "dropping event");
        if let Some(f) = &self.on_event_drop {
            f(event, reason);
        }
    }

    pub fn work_start(&self, item: &WorkItem) {
        if let Some(f) = &self.on_work_start {
            f(item);
        }
    }

    pub fn work_end(&self, result: &WorkResult) {
        if let Some(f) = &self.on_work_end {
            f(result);
        }
    }

    pub fn worker_panic(&self, worker_id: usize, recovered: &str) {
        tracing::warn!(worker_id, recovered, "worker panicked, respawning");
        if let Some(f) = &self.on_worker_panic {
            f(worker_id, recovered);
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("on_flush_start", &self.on_flush_start.is_some())
            .field("on_flush_end", &self.on_flush_end.is_some())
            .field("on_event_drop", &self.on_event_drop.is_some())
            .field("on_work_start", &self.on_work_start.is_some())
            .field("on_work_end", &self.on_work_end.is_some())
            .field("on_worker_panic", &self.on_worker_panic.is_some())
            .finish()
    }
}
