//! Configuration structs for the queue, worker pool, and composite front end.

use std::time::Duration;

use bon::Builder;

use crate::hooks::Hooks;

pub const DEFAULT_FLUSH_AT: usize = 15;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
pub const DEFAULT_NUM_WORKERS: usize = 4;
pub const DEFAULT_WORK_BUFFER_SIZE: usize = 256;
pub const DEFAULT_WORKER_POOL_THRESHOLD: usize = 500;

/// Configuration for the basic queue (buffer + scheduler + retry engine).
#[derive(Clone, Builder)]
pub struct QueueConfig {
    #[builder(default = DEFAULT_FLUSH_AT)]
    pub flush_at: usize,
    #[builder(default = DEFAULT_FLUSH_INTERVAL)]
    pub flush_interval: Duration,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[builder(default = DEFAULT_RETRY_BACKOFF)]
    pub retry_backoff: Duration,
    #[builder(default = DEFAULT_MAX_QUEUE_SIZE)]
    pub max_queue_size: usize,
    #[builder(default)]
    pub hooks: Hooks,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the worker pool.
#[derive(Clone, Builder)]
pub struct PoolConfig {
    #[builder(default = DEFAULT_NUM_WORKERS)]
    pub num_workers: usize,
    #[builder(default = DEFAULT_WORK_BUFFER_SIZE)]
    pub work_buffer_size: usize,
    #[builder(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    #[builder(default = DEFAULT_RETRY_BACKOFF)]
    pub retry_backoff: Duration,
    #[builder(default)]
    pub hooks: Hooks,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the composite queue.
#[derive(Clone, Builder)]
pub struct CompositeConfig {
    #[builder(default)]
    pub queue: QueueConfig,
    pub pool: Option<PoolConfig>,
    #[builder(default = DEFAULT_WORKER_POOL_THRESHOLD)]
    pub worker_pool_threshold: usize,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
