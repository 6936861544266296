//! Worker pools for the per-line write path.
//!
//! Exactly one flavor is configured: a *static* pool with a fixed worker
//! count whose bounded queue makes submission block under load, or a
//! *dynamic* pool that spawns a task per item and always accepts. The
//! connection handler's submit call is the only behavioral difference
//! between the two.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;

use crossfire::MAsyncTx;
use serde::Deserialize;

use crate::error::OptionsError;

/// A unit of write-path work.
pub type Work = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Default queue slots ahead of the static workers.
const DEFAULT_QUEUE_SIZE: usize = 1024;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Worker pool configuration. Exactly one flavor must be set.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkerPoolConfig {
    #[serde(rename = "static")]
    pub static_pool: Option<StaticPoolConfig>,

    #[serde(rename = "dynamic")]
    pub dynamic_pool: Option<DynamicPoolConfig>,
}

impl WorkerPoolConfig {
    /// A dynamic pool, the usual default for deployments without strict
    /// concurrency bounds.
    pub fn dynamic() -> Self {
        Self {
            static_pool: None,
            dynamic_pool: Some(DynamicPoolConfig::default()),
        }
    }
}

/// Fixed-size pool configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StaticPoolConfig {
    /// Number of worker tasks.
    pub workers: usize,

    /// Queue slots ahead of the workers; submission blocks when full.
    pub queue_size: usize,
}

impl Default for StaticPoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

/// Elastic pool configuration. Present for config symmetry; the dynamic
/// pool has no tunables.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DynamicPoolConfig {}

/// A pool ready to execute work items.
pub enum WorkerPool {
    Static(StaticWorkerPool),
    Dynamic(DynamicWorkerPool),
}

impl WorkerPool {
    /// Build from config, enforcing that exactly one flavor is configured.
    pub fn from_config(config: &WorkerPoolConfig) -> Result<Self, OptionsError> {
        match (&config.static_pool, &config.dynamic_pool) {
            (Some(cfg), None) => Ok(WorkerPool::Static(StaticWorkerPool::new(
                cfg.workers,
                cfg.queue_size,
            ))),
            (None, Some(_)) => Ok(WorkerPool::Dynamic(DynamicWorkerPool)),
            (None, None) => Err(OptionsError::WorkerPoolNotSet),
            (Some(_), Some(_)) => Err(OptionsError::MultipleWorkerPools),
        }
    }

    /// Hand a work item to the pool.
    ///
    /// Static pools may block until a queue slot frees; dynamic pools
    /// always accept immediately.
    pub async fn submit(&self, work: Work) {
        match self {
            WorkerPool::Static(pool) => pool.submit(work).await,
            WorkerPool::Dynamic(pool) => pool.submit(work),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerPool::Static(pool) => f
                .debug_struct("StaticWorkerPool")
                .field("workers", &pool.workers)
                .finish(),
            WorkerPool::Dynamic(_) => f.debug_struct("DynamicWorkerPool").finish(),
        }
    }
}

/// Fixed worker tasks consuming a bounded queue.
pub struct StaticWorkerPool {
    tx: MAsyncTx<Work>,
    workers: usize,
}

impl StaticWorkerPool {
    /// Spawn `workers` tasks sharing one bounded queue of `queue_size`.
    pub fn new(workers: usize, queue_size: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = crossfire::mpmc::bounded_async::<Work>(queue_size.max(1));

        for _ in 0..workers {
            let rx = rx.clone();
            tokio::spawn(async move {
                while let Ok(work) = rx.recv().await {
                    work.await;
                }
            });
        }

        Self { tx, workers }
    }

    /// Enqueue a work item, waiting for a queue slot when full.
    async fn submit(&self, work: Work) {
        if self.tx.send(work).await.is_err() {
            // All workers exited; nothing is left to run the item.
            tracing::error!("static worker pool queue closed, dropping work item");
        }
    }
}

/// Spawn-per-item pool; submission never blocks.
pub struct DynamicWorkerPool;

impl DynamicWorkerPool {
    fn submit(&self, work: Work) {
        tokio::spawn(work);
    }
}

#[cfg(test)]
#[path = "workers_test.rs"]
mod workers_test;
