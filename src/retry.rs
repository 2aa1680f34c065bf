//! Retry engine: backoff, max-attempts, and partial-failure apportionment.
//!
//! A single consistent linear schedule is used everywhere in this crate:
//! before attempt `k` (`k > 0`), sleep `retry_backoff * k`. The same schedule
//! drives both the basic queue's flush retries and the worker pool's
//! per-item retries — see DESIGN.md for the rationale.

use std::time::Duration;

use tokio::sync::watch;

use crate::error::EventError;
use crate::event::{BatchRequest, Envelope, Event};
use crate::submitter::{classify_errors, Submitter};

/// Result of driving one batch through the retry engine.
pub enum RetryOutcome {
    /// Every event in the batch was accepted.
    Success,
    /// The response reported per-event errors, even if the top-level
    /// `success` flag was false; these are never retried at the batch level.
    PartialFailure {
        processed: usize,
        failed: Vec<EventError>,
    },
    /// Every attempt failed and `max_retries` was exhausted.
    Exhausted,
    /// A shutdown signal fired during a backoff sleep; no further attempts
    /// were made.
    ShutdownAborted,
}

/// Drive `events` through up to `max_retries + 1` submissions, sleeping
/// `retry_backoff * attempt` before each retry. `shutdown` is polled during
/// the sleep only — once a submission is in flight it always completes.
pub async fn retry_submit(
    submitter: &dyn Submitter,
    events: &[Event],
    max_retries: u32,
    retry_backoff: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> RetryOutcome {
    let envelopes: Vec<Envelope> = events.iter().map(Envelope::from).collect();

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = retry_backoff * attempt;
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::warn!("shutdown preempted retry backoff, aborting further retries");
                        return RetryOutcome::ShutdownAborted;
                    }
                }
            }
        }

        let request = match BatchRequest::new(envelopes.clone()) {
            Ok(r) => r,
            Err(_) => return RetryOutcome::Exhausted,
        };

        match submitter.submit_batch(request).await {
            Ok(response) if response.has_errors() => {
                let failed = classify_errors(&response.errors);
                return RetryOutcome::PartialFailure {
                    processed: response.usage.events_processed,
                    failed,
                };
            }
            Ok(response) if response.is_full_success() => {
                return RetryOutcome::Success;
            }
            Ok(_) => {
                // success == false, no per-event detail: retryable batch failure.
                tracing::warn!(attempt, "batch submission reported failure, retrying");
                continue;
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "retryable submission error");
                continue;
            }
            Err(_) => {
                return RetryOutcome::Exhausted;
            }
        }
    }

    RetryOutcome::Exhausted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BatchResponse, TraceBody, UsageStats};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSubmitter {
        responses: Mutex<Vec<Result<BatchResponse, crate::error::Error>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Submitter for ScriptedSubmitter {
        async fn submit_batch(
            &self,
            _request: BatchRequest,
        ) -> Result<BatchResponse, crate::error::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("no more scripted responses");
            }
            responses.remove(0)
        }
    }

    fn event() -> Event {
        Event::trace_create(TraceBody::new("t1", "trace"))
    }

    fn success_response() -> BatchResponse {
        BatchResponse {
            success: true,
            errors: vec![],
            usage: UsageStats {
                events_processed: 1,
                events_skipped: 0,
                events_failed: 0,
            },
            metadata: None,
            timestamp: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds() {
        let submitter = ScriptedSubmitter {
            responses: Mutex::new(vec![
                Err(crate::error::Error::Server {
                    status: 500,
                    message: "boom".into(),
                    request_id: None,
                }),
                Err(crate::error::Error::Server {
                    status: 500,
                    message: "boom".into(),
                    request_id: None,
                }),
                Ok(success_response()),
            ]),
            calls: AtomicUsize::new(0),
        };
        let (_tx, mut rx) = watch::channel(false);
        let outcome = retry_submit(
            &submitter,
            &[event()],
            3,
            Duration::from_millis(1),
            &mut rx,
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::Success));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_retries() {
        let submitter = ScriptedSubmitter {
            responses: Mutex::new(
                (0..4)
                    .map(|_| {
                        Err(crate::error::Error::Server {
                            status: 500,
                            message: "boom".into(),
                            request_id: None,
                        })
                    })
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        };
        let (_tx, mut rx) = watch::channel(false);
        let outcome = retry_submit(
            &submitter,
            &[event()],
            3,
            Duration::from_millis(1),
            &mut rx,
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::Exhausted));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn non_retryable_error_exhausts_immediately() {
        let submitter = ScriptedSubmitter {
            responses: Mutex::new(vec![Err(crate::error::Error::Auth {
                message: "nope".into(),
                request_id: None,
            })]),
            calls: AtomicUsize::new(0),
        };
        let (_tx, mut rx) = watch::channel(false);
        let outcome = retry_submit(
            &submitter,
            &[event()],
            3,
            Duration::from_millis(1),
            &mut rx,
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::Exhausted));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_preempts_backoff_sleep() {
        let submitter = ScriptedSubmitter {
            responses: Mutex::new(vec![
                Err(crate::error::Error::Server {
                    status: 500,
                    message: "boom".into(),
                    request_id: None,
                }),
                Ok(success_response()),
            ]),
            calls: AtomicUsize::new(0),
        };
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = tx.send(true);
        });
        let outcome = retry_submit(
            &submitter,
            &[event()],
            3,
            Duration::from_secs(10),
            &mut rx,
        )
        .await;
        assert!(matches!(outcome, RetryOutcome::ShutdownAborted));
    }
}
