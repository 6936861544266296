//! Tests for the worker pools.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::OptionsError;
use crate::workers::{
    DynamicPoolConfig, StaticPoolConfig, WorkerPool, WorkerPoolConfig,
};

#[test]
fn test_config_requires_exactly_one_pool() {
    let neither = WorkerPoolConfig::default();
    assert!(matches!(
        WorkerPool::from_config(&neither),
        Err(OptionsError::WorkerPoolNotSet)
    ));

    let both = WorkerPoolConfig {
        static_pool: Some(StaticPoolConfig::default()),
        dynamic_pool: Some(DynamicPoolConfig::default()),
    };
    assert!(matches!(
        WorkerPool::from_config(&both),
        Err(OptionsError::MultipleWorkerPools)
    ));
}

#[test]
fn test_config_deserializes_flavors() {
    let config: WorkerPoolConfig =
        serde_yaml::from_str("static:\n  workers: 3\n  queue_size: 16\n").unwrap();
    let static_pool = config.static_pool.as_ref().unwrap();
    assert_eq!(static_pool.workers, 3);
    assert_eq!(static_pool.queue_size, 16);
    assert!(config.dynamic_pool.is_none());

    let config: WorkerPoolConfig = serde_yaml::from_str("dynamic: {}\n").unwrap();
    assert!(config.static_pool.is_none());
    assert!(config.dynamic_pool.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_static_pool_runs_all_items() {
    let pool = WorkerPool::from_config(&WorkerPoolConfig {
        static_pool: Some(StaticPoolConfig {
            workers: 2,
            queue_size: 4,
        }),
        dynamic_pool: None,
    })
    .unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..32 {
        let counter = Arc::clone(&counter);
        pool.submit(Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .await;
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < 32 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all submitted work should run");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dynamic_pool_runs_all_items() {
    let pool = WorkerPool::from_config(&WorkerPoolConfig::dynamic()).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..32 {
        let counter = Arc::clone(&counter);
        pool.submit(Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
        .await;
    }

    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < 32 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all submitted work should run");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_static_pool_submission_blocks_when_saturated() {
    let pool = WorkerPool::from_config(&WorkerPoolConfig {
        static_pool: Some(StaticPoolConfig {
            workers: 1,
            queue_size: 1,
        }),
        dynamic_pool: None,
    })
    .unwrap();

    let gate = Arc::new(tokio::sync::Semaphore::new(0));

    // Occupy the single worker and fill the single queue slot.
    for _ in 0..2 {
        let gate = Arc::clone(&gate);
        pool.submit(Box::pin(async move {
            let _permit = gate.acquire().await.unwrap();
        }))
        .await;
    }

    // The next submission cannot complete until a slot frees.
    let blocked = tokio::time::timeout(
        Duration::from_millis(100),
        pool.submit(Box::pin(async {})),
    )
    .await;
    assert!(blocked.is_err(), "submit should block while saturated");

    // Release the workers and confirm submission unblocks.
    gate.add_permits(8);
    tokio::time::timeout(Duration::from_secs(5), pool.submit(Box::pin(async {})))
        .await
        .expect("submit should unblock once the queue drains");
}
