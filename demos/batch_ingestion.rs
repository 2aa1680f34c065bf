//! Demonstrates the basic queue: enqueue a burst of trace/span/generation
//! events and let the size and time triggers flush them automatically.

use std::time::Duration;

use ingestion_pipeline::{
    BasicQueue, Event, HttpSubmitter, HttpSubmitterConfig, ObservationBody, ObservationKind,
    QueueConfig, TraceBody,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let public_key = std::env::var("LANGFUSE_PUBLIC_KEY").unwrap_or_else(|_| "pk-lf-demo".into());
    let secret_key = std::env::var("LANGFUSE_SECRET_KEY").unwrap_or_else(|_| "sk-lf-demo".into());
    let submitter = HttpSubmitter::new(HttpSubmitterConfig::new(public_key, secret_key))?;

    let queue = BasicQueue::new(
        std::sync::Arc::new(submitter),
        QueueConfig::builder()
            .flush_at(10)
            .flush_interval(Duration::from_secs(2))
            .max_retries(3)
            .build(),
    );

    for i in 0..10 {
        let trace_id = Uuid::new_v4().to_string();

        let mut trace = TraceBody::new(trace_id.clone(), format!("batch-trace-{i}"));
        trace.user_id = Some("demo-user".to_string());
        trace.tags = vec!["batch".to_string(), "demo".to_string()];
        queue.enqueue(Event::trace_create(trace)).await?;

        let mut span = ObservationBody::new(
            Uuid::new_v4().to_string(),
            trace_id,
            ObservationKind::Span,
            format!("span-{i}"),
        );
        span.input = Some(serde_json::json!({"prompt": format!("process item {i}")}));
        queue.enqueue(Event::span_create(span)).await?;
    }

    println!("enqueued 20 events ({} buffered now)", queue.size().await);

    queue.flush().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = queue.stats();
    println!(
        "processed={} failed={} dropped={} batches_submitted={}",
        stats.events_processed, stats.events_failed, stats.events_dropped, stats.batches_submitted
    );

    queue.shutdown(Duration::from_secs(10)).await?;
    Ok(())
}
