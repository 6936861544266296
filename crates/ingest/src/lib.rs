//! Carbon ingest pipeline.
//!
//! Accepts carbon plaintext metrics over a stream transport, classifies each
//! metric against a live-updatable rule set, and forwards matched metrics to
//! a downstream downsampler-and-writer.
//!
//! # Data flow, per metric
//!
//! ```text
//! listener -> bytes -> line scanner -> pool rent -> worker pool -> matcher -> writer -> pool return
//! ```
//!
//! # Control flow, per topology update
//!
//! ```text
//! namespace watcher -> validate -> compile -> atomic swap
//! ```

mod error;
mod metrics;
mod pool;
mod server;
mod workers;
mod writer;

pub use error::{IngesterError, OptionsError};
pub use metrics::{
    default_ingest_latency_buckets, default_write_latency_buckets, DurationHistogram,
    IngestMetrics, IngestSnapshot, LatencyBuckets,
};
pub use pool::{
    LineResources, PoolMetrics, PoolSnapshot, ResourcePool, DEFAULT_POOL_CAPACITY,
    MAX_POOLED_NAME_CAPACITY, MAX_POOLED_TAGS,
};
pub use server::{CarbonServer, ServerConfig};
pub use workers::{
    DynamicPoolConfig, StaticPoolConfig, Work, WorkerPool, WorkerPoolConfig,
};
pub use writer::{DebugWriter, WriteError, WriteOptions, Writer};

use std::mem;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use anthracite_protocol::{
    copy_and_rewrite, generate_tags_into, CarbonScanner, ClusterNamespace, Datapoint, TimeUnit,
    UnixNanos,
};
use anthracite_rules::{compile_rules, CompiledRule, IngesterConfig, RuleSet};

/// Carbon metrics ingester.
///
/// One instance serves every connection. The namespace watcher drives
/// [`Ingester::on_update`]; the listener hands each accepted connection's
/// byte stream to [`Ingester::handle`].
pub struct Ingester {
    writer: Arc<dyn Writer>,
    config: IngesterConfig,
    rules: RuleSet,
    pool: ResourcePool,
    workers: WorkerPool,
    metrics: Arc<IngestMetrics>,

    /// Process-wide cancellation context passed to every writer call.
    /// Allocating a per-metric context is deliberately avoided; the writer's
    /// own timeouts govern each call.
    ctx: CancellationToken,
}

impl Ingester {
    /// Build an ingester.
    ///
    /// Fails fast on configuration errors: a missing or doubled worker pool,
    /// or configured rules that cannot compile.
    pub fn new(
        writer: Arc<dyn Writer>,
        config: IngesterConfig,
        worker_config: &WorkerPoolConfig,
        buckets: LatencyBuckets,
        ctx: CancellationToken,
    ) -> Result<Self, IngesterError> {
        let workers = WorkerPool::from_config(worker_config)?;

        // Topology-independent sanity check so bad patterns surface at
        // startup instead of at the first namespace update.
        compile_rules(&config.rules)?;

        Ok(Self {
            writer,
            config,
            rules: RuleSet::new(),
            pool: ResourcePool::new(DEFAULT_POOL_CAPACITY),
            workers,
            metrics: Arc::new(IngestMetrics::new(buckets)),
            ctx,
        })
    }

    /// Metrics handle for external reporting.
    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Resource pool counters.
    pub fn pool_snapshot(&self) -> PoolSnapshot {
        self.pool.metrics().snapshot()
    }

    /// The active compiled rules.
    pub fn active_rules(&self) -> Arc<Vec<CompiledRule>> {
        self.rules.snapshot()
    }

    /// Namespace watcher callback.
    ///
    /// Rebuilds and atomically swaps the active rules. On any validation or
    /// compilation failure the previous rules stay active; running matches
    /// are never disturbed. Invocations are serialized internally, so the
    /// watcher may call this from any context.
    pub fn on_update(&self, namespaces: &[ClusterNamespace]) {
        if self.rules.apply_update(&self.config, namespaces) {
            tracing::info!(
                rules = self.rules.snapshot().len(),
                namespaces = namespaces.len(),
                "installed carbon ingestion rules"
            );
        }
    }

    /// Serve one connection's byte stream until EOF, then drain outstanding
    /// writes.
    ///
    /// The stream is not closed here; ownership stays with the listener.
    /// Writes dispatched for earlier lines may complete out of order with
    /// later ones; ordering is not promised downstream.
    pub async fn handle<S>(self: Arc<Self>, stream: S)
    where
        S: AsyncRead + Unpin,
    {
        let mut scanner = CarbonScanner::new(stream);
        let outstanding = TaskTracker::new();

        tracing::debug!("handling new carbon ingestion connection");

        while scanner.advance().await {
            let received = Instant::now();
            let (name, timestamp, value) = scanner.metric();

            let mut resources = self.pool.rent();
            // The scanner recycles its buffer on the next advance, so the
            // name is copied out now; the configured rewrite happens during
            // the copy.
            copy_and_rewrite(&mut resources.name, name, &self.config.rewrite);

            let ingester = Arc::clone(&self);
            let work: Work = Box::pin(outstanding.track_future(async move {
                ingester.process(resources, timestamp, value, received).await;
            }));
            self.workers.submit(work).await;

            self.metrics.record_malformed(scanner.take_malformed());
        }

        // Pick up malformed lines scanned after the last good metric.
        self.metrics.record_malformed(scanner.take_malformed());

        if let Some(err) = scanner.error() {
            tracing::error!(error = %err, "error scanning carbon ingestion connection");
        }

        tracing::debug!("waiting for outstanding carbon ingestion writes to complete");
        outstanding.close();
        outstanding.wait().await;
        tracing::debug!("all outstanding carbon ingestion writes completed");
    }

    /// Write-path work item body: match, write, account, release.
    async fn process(
        &self,
        mut resources: LineResources,
        timestamp: UnixNanos,
        value: f64,
        received: Instant,
    ) {
        let ok = self.write(&mut resources, timestamp, value).await;
        if ok {
            self.metrics.record_success();
        }

        // Record age regardless of success or failure: errors are often a
        // function of how old the incoming metrics are, and skipping the
        // observation on failure would hide exactly that.
        let age = unix_nanos_now().saturating_sub(timestamp).max(0);
        self.metrics
            .ingest_latency
            .record(std::time::Duration::from_nanos(age as u64));
        self.metrics.write_latency.record(received.elapsed());

        self.pool.put(resources);
    }

    /// Match the metric against the active rules and run the write cascade.
    ///
    /// Rules are walked in configuration order. The first match writes with
    /// that rule's mapping rules and storage policies; unless the rule sets
    /// `continue`, the walk stops there. A failed write short-circuits the
    /// cascade and the metric counts as errored.
    ///
    /// Returns whether at least one rule matched with every write clean.
    async fn write(
        &self,
        resources: &mut LineResources,
        timestamp: UnixNanos,
        value: f64,
    ) -> bool {
        let rules = self.rules.snapshot();

        // Tag values are zero-copy slices of the name, so the name is frozen
        // for the duration of the cascade and reclaimed afterwards.
        let name = mem::take(&mut resources.name).freeze();

        let mut matched = 0usize;
        let mut failed = false;
        for rule in rules.iter() {
            if !rule.matches(&name) {
                continue;
            }

            // Exactly one of the rule's mapping rules / storage policies is
            // populated, so one of these assignments is a no-op.
            let opts = WriteOptions {
                downsample_override: true,
                write_override: true,
                mapping_rules: &rule.mapping_rules,
                storage_policies: &rule.storage_policies,
            };

            tracing::debug!(
                name = %String::from_utf8_lossy(&name),
                pattern = %rule.config.pattern,
                contains = %rule.config.contains,
                "carbon metric matched by rule"
            );

            if !self
                .write_with_options(&name, resources, timestamp, value, opts)
                .await
            {
                failed = true;
                break;
            }
            matched += 1;

            if !rule.config.continue_matching {
                break;
            }
        }

        if matched == 0 && !failed {
            tracing::debug!(
                name = %String::from_utf8_lossy(&name),
                "no rules matched carbon metric, skipping"
            );
        }

        // Release the tag slices before reclaiming the name buffer; the
        // writer contract guarantees nothing downstream still references it.
        resources.tags.clear();
        resources.name = name
            .try_into_mut()
            .unwrap_or_else(|_| BytesMut::with_capacity(MAX_POOLED_NAME_CAPACITY));

        matched > 0 && !failed
    }

    /// One write under one matched rule. Returns whether it completed clean.
    async fn write_with_options(
        &self,
        name: &Bytes,
        resources: &mut LineResources,
        timestamp: UnixNanos,
        value: f64,
        opts: WriteOptions<'_>,
    ) -> bool {
        resources.datapoints[0] = Datapoint { timestamp, value };

        if let Err(err) = generate_tags_into(name, &mut resources.tags) {
            tracing::error!(
                name = %String::from_utf8_lossy(name),
                error = %err,
                "error generating tags from carbon metric name"
            );
            self.metrics.record_malformed(1);
            return false;
        }

        if let Err(err) = self
            .writer
            .write(
                &self.ctx,
                &resources.tags,
                &resources.datapoints,
                TimeUnit::Seconds,
                None,
                opts,
            )
            .await
        {
            tracing::error!(
                name = %String::from_utf8_lossy(name),
                error = %err,
                "error writing carbon metric"
            );
            self.metrics.record_error();
            return false;
        }

        true
    }
}

fn unix_nanos_now() -> UnixNanos {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as i64)
        .unwrap_or(0)
}
