//! Carbon wire protocol support.
//!
//! Everything needed to turn a raw carbon plaintext byte stream into typed
//! metrics: the line scanner, graphite tag decomposition, name rewriting,
//! and the core value types shared across the ingest pipeline.
//!
//! # Design Principles
//!
//! - **Zero-copy**: tag values are `bytes::Bytes` slices of the name they
//!   were split from
//! - **No allocations in hot path**: the scanner reuses one read buffer;
//!   tag generation reuses caller-provided sinks
//! - **Malformed input never kills a connection**: bad lines are counted and
//!   skipped

mod rewrite;
mod scanner;
mod tags;
mod types;

pub use rewrite::{copy_and_rewrite, is_segment_byte_valid, RewriteConfig};
pub use scanner::{CarbonScanner, MAX_LINE_LENGTH};
pub use tags::{
    generate_tags, generate_tags_into, tag_name, MalformedNameError, MATCH_ALL_PATTERN, SEPARATOR,
};
pub use types::{
    AggregationKind, ClusterNamespace, Datapoint, MappingRule, MetricsType, NamespaceAttributes,
    RetentionResolution, StoragePolicy, Tag, TimeUnit, UnixNanos, NANOS_PER_SEC,
};
