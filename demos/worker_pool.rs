//! Demonstrates the worker pool's fan-out: submit single-event work items
//! directly, bypassing the buffered queue, and watch per-worker load spread
//! out while statistics accumulate.

use std::sync::Arc;
use std::time::Duration;

use ingestion_pipeline::{
    Event, HttpSubmitter, HttpSubmitterConfig, PoolConfig, ScoreBody, ScoreSource, WorkerPool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let submitter = HttpSubmitter::new(HttpSubmitterConfig::new("pk-lf-demo", "sk-lf-demo"))?;

    let pool = WorkerPool::new(
        Arc::new(submitter),
        PoolConfig::builder()
            .num_workers(4)
            .work_buffer_size(100)
            .build(),
    );

    for i in 0..40 {
        let score = ScoreBody::numeric(
            format!("score-{i}"),
            format!("trace-{i}"),
            "relevance",
            0.5 + (i as f64 % 5.0) / 10.0,
            ScoreSource::Eval,
        );
        pool.submit_work(vec![Event::score_create(score)])?;
    }

    tokio::time::sleep(Duration::from_secs(1)).await;

    let stats = pool.stats();
    println!(
        "processed={} failed={} panics={} per_worker={:?}",
        stats.work_items_processed, stats.work_items_failed, stats.worker_panics,
        stats.per_worker_counts
    );

    pool.shutdown(Duration::from_secs(10)).await?;
    Ok(())
}
