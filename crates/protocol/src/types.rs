//! Core value types shared across the ingest pipeline.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;

/// Nanoseconds since the Unix epoch.
pub type UnixNanos = i64;

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A single observed value for a metric.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Datapoint {
    /// Observation time, nanoseconds since the Unix epoch.
    pub timestamp: UnixNanos,

    /// Observed value.
    pub value: f64,
}

/// Precision of datapoint timestamps as handed to a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
    Nanoseconds,
}

/// A name/value pair decomposed from a dotted carbon name.
///
/// Both sides are `Bytes` so tag values can be zero-copy slices of the
/// metric name they were split from.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub name: Bytes,
    pub value: Bytes,
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value),
        )
    }
}

/// Identity of an aggregated cluster namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetentionResolution {
    pub resolution: Duration,
    pub retention: Duration,
}

/// Target namespace for a write: resolution, timestamp precision, retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoragePolicy {
    pub resolution: Duration,
    pub precision: TimeUnit,
    pub retention: Duration,
}

impl StoragePolicy {
    /// Build a policy with seconds precision, the carbon wire resolution.
    pub fn new(resolution: Duration, retention: Duration) -> Self {
        Self {
            resolution,
            precision: TimeUnit::Seconds,
            retention,
        }
    }

    /// The namespace identity this policy targets.
    pub fn retention_resolution(&self) -> RetentionResolution {
        RetentionResolution {
            resolution: self.resolution,
            retention: self.retention,
        }
    }
}

impl fmt::Display for StoragePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{:?}", self.resolution, self.retention)
    }
}

/// How pre-aggregated values are combined downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    Last,
    Min,
    Max,
    #[default]
    Mean,
    Median,
    Count,
    Sum,
    SumSq,
    Stdev,
    P90,
    P95,
    P99,
}

/// One downstream instruction pairing aggregations with storage policies.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub aggregations: Vec<AggregationKind>,
    pub storage_policies: Vec<StoragePolicy>,
}

/// Kind of metrics a cluster namespace stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsType {
    Unaggregated,
    Aggregated,
}

/// A storage namespace as reported by the namespace watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNamespace {
    pub id: String,
    pub attributes: NamespaceAttributes,
}

/// Storage attributes of a cluster namespace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NamespaceAttributes {
    pub metrics_type: MetricsType,
    pub resolution: Duration,
    pub retention: Duration,
}

impl ClusterNamespace {
    /// An aggregated namespace with the given identity.
    pub fn aggregated(id: impl Into<String>, resolution: Duration, retention: Duration) -> Self {
        Self {
            id: id.into(),
            attributes: NamespaceAttributes {
                metrics_type: MetricsType::Aggregated,
                resolution,
                retention,
            },
        }
    }

    /// An unaggregated namespace with the given identity.
    pub fn unaggregated(id: impl Into<String>, retention: Duration) -> Self {
        Self {
            id: id.into(),
            attributes: NamespaceAttributes {
                metrics_type: MetricsType::Unaggregated,
                resolution: Duration::ZERO,
                retention,
            },
        }
    }
}
