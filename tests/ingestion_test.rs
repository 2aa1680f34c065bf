//! End-to-end tests against a mocked ingestion endpoint, exercising the
//! queue/scheduler/retry engine together the way a real HTTP backend would
//! see them, mocking the `/api/public/ingestion` route with `mockito`.

use std::sync::Arc;
use std::time::Duration;

use ingestion_pipeline::{
    BasicQueue, CompositeConfig, Event, HttpSubmitter, HttpSubmitterConfig, IngestionQueue,
    PoolConfig, QueueConfig, TraceBody,
};
use mockito::Server;

fn trace_event(id: &str) -> Event {
    Event::trace_create(TraceBody::new(id, "mock-test-trace"))
}

fn submitter(server: &Server) -> Arc<HttpSubmitter> {
    Arc::new(
        HttpSubmitter::new(
            HttpSubmitterConfig::new("pk-lf-test", "sk-lf-test").base_url(server.url()),
        )
        .expect("valid submitter config"),
    )
}

#[tokio::test]
async fn batch_trigger_flushes_at_flush_at_threshold() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/public/ingestion")
        .with_status(200)
        .with_header("content-type", "application/json")
        .create_async()
        .await;

    let queue = BasicQueue::new(
        submitter(&server),
        QueueConfig::builder()
            .flush_at(3)
            .flush_interval(Duration::from_secs(100))
            .build(),
    );

    queue.enqueue(trace_event("t1")).await.unwrap();
    queue.enqueue(trace_event("t2")).await.unwrap();
    queue.enqueue(trace_event("t3")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    mock.assert_async().await;
    assert_eq!(queue.size().await, 0);
    assert_eq!(queue.stats().events_processed, 3);

    let _ = queue.shutdown(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn periodic_trigger_flushes_a_lone_event() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/public/ingestion")
        .with_status(200)
        .create_async()
        .await;

    let queue = BasicQueue::new(
        submitter(&server),
        QueueConfig::builder()
            .flush_at(100)
            .flush_interval(Duration::from_millis(50))
            .build(),
    );

    queue.enqueue(trace_event("t1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    mock.assert_async().await;
    assert_eq!(queue.size().await, 0);

    let _ = queue.shutdown(Duration::from_secs(2)).await;
}

// Retry-then-succeed is covered at the unit level in `src/retry.rs`'s
// `retries_then_succeeds` test via a scripted fake `Submitter`, which can
// assert an exact call sequence without depending on how an HTTP mock
// server orders overlapping route matchers.

#[tokio::test]
async fn max_retries_exceeded_drops_the_batch_and_fires_hooks() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/public/ingestion")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let dropped: Arc<std::sync::Mutex<Vec<(String, String)>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));
    let dropped_clone = dropped.clone();

    let queue = BasicQueue::new(
        submitter(&server),
        QueueConfig::builder()
            .flush_at(1)
            .flush_interval(Duration::from_secs(100))
            .max_retries(2)
            .retry_backoff(Duration::from_millis(5))
            .hooks(ingestion_pipeline::Hooks {
                on_event_drop: Some(Arc::new(move |event, reason| {
                    dropped_clone
                        .lock()
                        .unwrap()
                        .push((event.id.clone(), reason.to_string()));
                })),
                ..Default::default()
            })
            .build(),
    );

    queue.enqueue(trace_event("t1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let recorded = dropped.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, "t1");
    assert_eq!(recorded[0].1, "max_retries_exceeded");

    let stats = queue.stats();
    assert_eq!(stats.events_failed, 1);
    assert_eq!(stats.batches_failed, 1);

    let _ = queue.shutdown(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn queue_full_age_drop_evicts_oldest_first() {
    let server = Server::new_async().await;

    let dropped: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
    let dropped_clone = dropped.clone();

    let queue = BasicQueue::new(
        submitter(&server),
        QueueConfig::builder()
            .max_queue_size(3)
            .flush_at(100)
            .flush_interval(Duration::from_secs(3600))
            .hooks(ingestion_pipeline::Hooks {
                on_event_drop: Some(Arc::new(move |event, reason| {
                    assert_eq!(reason, "queue_full");
                    dropped_clone.lock().unwrap().push(event.id.clone());
                })),
                ..Default::default()
            })
            .build(),
    );

    for id in ["e1", "e2", "e3", "e4", "e5"] {
        queue.enqueue(trace_event(id)).await.unwrap();
    }

    assert_eq!(dropped.lock().unwrap().as_slice(), ["e1", "e2"]);
    assert_eq!(queue.stats().events_dropped, 2);
    assert_eq!(queue.size().await, 3);

    let _ = queue.shutdown(Duration::from_secs(2)).await;
}

#[tokio::test]
async fn graceful_shutdown_flushes_pending_events_once() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/public/ingestion")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let queue = BasicQueue::new(
        submitter(&server),
        QueueConfig::builder()
            .flush_at(100)
            .flush_interval(Duration::from_secs(10))
            .build(),
    );

    for i in 0..5 {
        queue.enqueue(trace_event(&format!("t{i}"))).await.unwrap();
    }

    queue.shutdown(Duration::from_secs(10)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(queue.stats().events_processed, 5);
    assert!(matches!(
        queue.enqueue(trace_event("late")).await,
        Err(ingestion_pipeline::Error::Closed)
    ));
}

#[tokio::test]
async fn shutdown_on_empty_queue_does_not_call_submit() {
    let server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/public/ingestion")
        .expect(0)
        .create_async()
        .await;

    let queue = BasicQueue::new(submitter(&server), QueueConfig::default());
    queue.shutdown(Duration::from_secs(2)).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn composite_queue_routes_into_pool_once_buffer_backs_up() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/public/ingestion")
        .with_status(200)
        .expect_at_least(1)
        .create_async()
        .await;

    let queue = IngestionQueue::new(
        submitter(&server),
        CompositeConfig::builder()
            .queue(
                QueueConfig::builder()
                    .flush_at(1000)
                    .flush_interval(Duration::from_secs(3600))
                    .build(),
            )
            .pool(PoolConfig::builder().num_workers(2).build())
            .worker_pool_threshold(3)
            .build(),
    );

    for i in 0..10 {
        queue.enqueue(trace_event(&format!("t{i}"))).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    mock.assert_async().await;
    let pool_stats = queue.pool_stats().expect("pool configured");
    assert!(pool_stats.work_items_processed > 0);
    assert_eq!(queue.queue_stats().events_queued, 4);

    let _ = queue.shutdown(Duration::from_secs(2)).await;
}
