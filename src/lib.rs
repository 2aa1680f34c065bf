//! # ingestion-pipeline
//!
//! Client-side ingestion pipeline for an LLM observability service: buffer
//! events in-process, batch them, and submit them over HTTP with retry,
//! backoff, and an optional fan-out worker pool for load shedding.
//!
//! ## Quick start
//!
//! ```no_run
//! use ingestion_pipeline::{BasicQueue, Event, HttpSubmitter, HttpSubmitterConfig, QueueConfig, TraceBody};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let submitter = HttpSubmitter::new(HttpSubmitterConfig::new("pk-lf-...", "sk-lf-..."))?;
//! let queue = BasicQueue::new(Arc::new(submitter), QueueConfig::default());
//!
//! queue.enqueue(Event::trace_create(TraceBody::new("trace-1", "my-app"))).await?;
//! queue.shutdown(std::time::Duration::from_secs(10)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Composition
//!
//! - [`Event`] / [`Envelope`] / [`BatchRequest`] / [`BatchResponse`] — the
//!   wire data model (`event` module).
//! - [`Submitter`] / [`HttpSubmitter`] — the HTTP transport boundary.
//! - [`BasicQueue`] — bounded buffer, flush scheduler, and retry engine
//!   combined into the simplest usable front end.
//! - [`WorkerPool`] — bounded fan-out for callers that need more submit
//!   concurrency than one queue's serialized flushes can provide.
//! - [`IngestionQueue`] — composes a [`BasicQueue`] with an optional
//!   [`WorkerPool`], routing to the pool once the buffer backs up.
//!
//! Extension points ([`Hooks`]) are plain closures, not trait objects to
//! subclass; statistics ([`QueueStatsSnapshot`], [`PoolStatsSnapshot`]) are
//! snapshotted by value so a reader can never observe a half-updated count or
//! hold a lock through a caller's hands.
//!
//! ## License
//!
//! Licensed under either of:
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE))
//! - MIT license ([LICENSE-MIT](LICENSE-MIT))

#![warn(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod basic_queue;
pub mod buffer;
pub mod config;
pub mod error;
pub mod event;
pub mod hooks;
pub mod pool;
pub mod queue;
pub mod retry;
pub mod security;
pub mod stats;
pub mod submitter;

pub use basic_queue::BasicQueue;
pub use config::{CompositeConfig, PoolConfig, QueueConfig};
pub use error::{Error, EventError, Result};
pub use event::{
    BatchRequest, BatchResponse, Envelope, Event, EventType, ObservationBody, ObservationKind,
    ScoreBody, ScoreDataType, ScoreSource, TraceBody, ValidationError,
};
pub use hooks::Hooks;
pub use pool::{WorkItem, WorkResult, WorkerPool};
pub use queue::IngestionQueue;
pub use retry::RetryOutcome;
pub use security::SecretString;
pub use stats::{PoolStatsSnapshot, QueueStatsSnapshot};
pub use submitter::{HttpSubmitter, HttpSubmitterConfig, Submitter};
