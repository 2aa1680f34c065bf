//! Bounded multi-producer buffer with age-based drop.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::event::Event;

/// A finite sequence of pending events with capacity `max_queue_size`.
/// Enqueue appends at the tail; at capacity the oldest event is dropped to
/// make room. `copy_out` atomically snapshots and empties the buffer under
/// one lock acquisition: a batch's envelopes are always a contiguous prefix
/// of the buffer at copy-out time, and the buffer is truncated by exactly
/// that length before the submitter runs, so concurrent enqueues never see
/// duplicate events.
pub struct Buffer {
    inner: Mutex<VecDeque<Event>>,
    capacity: usize,
}

/// An event evicted by the age-drop policy, paired with the drop reason.
pub struct Dropped {
    pub event: Event,
    pub reason: &'static str,
}

impl Buffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest if at capacity.
    pub async fn push(&self, event: Event) -> Option<Dropped> {
        let mut buf = self.inner.lock().await;
        let evicted = if buf.len() >= self.capacity {
            buf.pop_front().map(|event| Dropped {
                event,
                reason: "queue_full",
            })
        } else {
            None
        };
        buf.push_back(event);
        evicted
    }

    /// Current number of buffered events.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Atomically take every buffered event, leaving the buffer empty.
    pub async fn copy_out(&self) -> Vec<Event> {
        let mut buf = self.inner.lock().await;
        std::mem::take(&mut *buf).into_iter().collect()
    }

    /// Re-queue events at the head (used to put partially-retried events
    /// back without losing their position relative to newer arrivals).
    pub async fn requeue_front(&self, events: Vec<Event>) {
        let mut buf = self.inner.lock().await;
        for event in events.into_iter().rev() {
            buf.push_front(event);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TraceBody;

    fn event(id: &str) -> Event {
        Event::trace_create(TraceBody::new(id, "t"))
    }

    #[tokio::test]
    async fn push_under_capacity_never_drops() {
        let buf = Buffer::new(3);
        assert!(buf.push(event("1")).await.is_none());
        assert!(buf.push(event("2")).await.is_none());
        assert_eq!(buf.len().await, 2);
    }

    #[tokio::test]
    async fn push_at_capacity_drops_oldest() {
        let buf = Buffer::new(2);
        assert!(buf.push(event("1")).await.is_none());
        assert!(buf.push(event("2")).await.is_none());
        let dropped = buf.push(event("3")).await.expect("should evict");
        assert_eq!(dropped.event.id, "1");
        assert_eq!(dropped.reason, "queue_full");
        let remaining = buf.copy_out().await;
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].id, "2");
        assert_eq!(remaining[1].id, "3");
    }

    #[tokio::test]
    async fn copy_out_empties_buffer_but_keeps_capacity() {
        let buf = Buffer::new(5);
        buf.push(event("1")).await;
        buf.push(event("2")).await;
        let snapshot = buf.copy_out().await;
        assert_eq!(snapshot.len(), 2);
        assert!(buf.is_empty().await);
        assert_eq!(buf.capacity(), 5);
    }
}
