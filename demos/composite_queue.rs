//! Demonstrates the composite queue routing between the buffered fast path
//! and the worker pool once the buffer backs up past the configured
//! threshold.

use std::sync::Arc;
use std::time::Duration;

use ingestion_pipeline::{
    CompositeConfig, Event, HttpSubmitter, HttpSubmitterConfig, IngestionQueue, PoolConfig,
    QueueConfig, TraceBody,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let submitter = HttpSubmitter::new(HttpSubmitterConfig::new("pk-lf-demo", "sk-lf-demo"))?;

    let queue = IngestionQueue::new(
        Arc::new(submitter),
        CompositeConfig::builder()
            .queue(QueueConfig::builder().flush_at(20).build())
            .pool(PoolConfig::builder().num_workers(4).build())
            .worker_pool_threshold(5)
            .build(),
    );

    for i in 0..30 {
        let event = Event::trace_create(TraceBody::new(
            format!("trace-{i}"),
            format!("composite-demo-{i}"),
        ));
        queue.enqueue(event).await?;
        if i % 10 == 0 {
            println!("after {} enqueues, buffered size = {}", i + 1, queue.size().await);
        }
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    let queue_stats = queue.queue_stats();
    println!(
        "basic queue: processed={} failed={} dropped={}",
        queue_stats.events_processed, queue_stats.events_failed, queue_stats.events_dropped
    );
    if let Some(pool_stats) = queue.pool_stats() {
        println!(
            "worker pool: processed={} failed={}",
            pool_stats.work_items_processed, pool_stats.work_items_failed
        );
    }

    queue.shutdown(Duration::from_secs(10)).await?;
    Ok(())
}
