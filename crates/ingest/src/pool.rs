//! Pooled per-line working buffers.
//!
//! Keeps the scan-to-write critical path free of per-metric allocation: each
//! scanned line rents a `LineResources`, which travels into the worker pool
//! and is returned exactly once on the write-completion path. Uses a
//! lock-free queue for O(1) rent/put.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;

use anthracite_protocol::{Datapoint, Tag};

/// Maximum pooled name buffer capacity in bytes.
pub const MAX_POOLED_NAME_CAPACITY: usize = 1024;

/// Maximum pooled tag slice capacity.
pub const MAX_POOLED_TAGS: usize = 16;

/// Default number of pooled instances.
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

/// Working buffers for one in-flight metric line.
///
/// At any moment an instance is held by exactly one of: the idle pool, the
/// scanner's post-copy stage, or an in-flight write.
#[derive(Debug)]
pub struct LineResources {
    /// Copied metric name; owned by this line until the write completes.
    pub name: BytesMut,

    /// Single-slot datapoint buffer. One datapoint is written at a time.
    pub datapoints: Vec<Datapoint>,

    /// Tag buffer reused across rentals.
    pub tags: Vec<Tag>,
}

impl LineResources {
    fn new() -> Self {
        Self {
            name: BytesMut::with_capacity(MAX_POOLED_NAME_CAPACITY),
            datapoints: vec![Datapoint::default()],
            tags: Vec::with_capacity(MAX_POOLED_TAGS),
        }
    }
}

/// Counters for pool behavior.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Rentals served from the pool.
    pub hits: AtomicU64,

    /// Rentals that had to allocate because the pool was drained.
    pub misses: AtomicU64,

    /// Instances accepted back into the pool.
    pub returns: AtomicU64,

    /// Instances dropped on return (grew past the shrink bounds, or the
    /// pool was full).
    pub drops: AtomicU64,
}

impl PoolMetrics {
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_return(&self) {
        self.returns.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_drop(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot.
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

/// Lock-free fixed-capacity pool of `LineResources`.
pub struct ResourcePool {
    queue: ArrayQueue<LineResources>,
    metrics: PoolMetrics,
}

impl ResourcePool {
    /// Create a pool pre-filled to `capacity`.
    pub fn new(capacity: usize) -> Self {
        let queue = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            let _ = queue.push(LineResources::new());
        }
        Self {
            queue,
            metrics: PoolMetrics::new(),
        }
    }

    /// Rent a reset instance, allocating only when the pool is drained.
    ///
    /// The queue pop guarantees no instance is ever handed out twice
    /// concurrently.
    #[inline]
    pub fn rent(&self) -> LineResources {
        match self.queue.pop() {
            Some(resources) => {
                self.metrics.record_hit();
                resources
            }
            None => {
                self.metrics.record_miss();
                LineResources::new()
            }
        }
    }

    /// Return an instance to the pool.
    ///
    /// Instances that grew past the shrink bounds are dropped instead of
    /// pooled, so the pool's memory footprint stays bounded. Accepted
    /// returns are reset: name cleared, datapoint slot zeroed, and tag
    /// entries dropped so byte-slice references do not pin retired name
    /// buffers.
    pub fn put(&self, mut resources: LineResources) {
        let too_large = resources.name.capacity() > MAX_POOLED_NAME_CAPACITY
            || resources.datapoints.len() != 1
            || resources.datapoints.capacity() != 1
            || resources.tags.capacity() > MAX_POOLED_TAGS;
        if too_large {
            self.metrics.record_drop();
            return;
        }

        resources.name.clear();
        resources.datapoints[0] = Datapoint::default();
        resources.tags.clear();

        if self.queue.push(resources).is_ok() {
            self.metrics.record_return();
        } else {
            self.metrics.record_drop();
        }
    }

    /// Instances currently idle in the pool.
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of pooled instances.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
