//! Downstream writer seam.
//!
//! The ingester hands matched metrics to a downsampler-and-writer through
//! this trait. The real implementation lives outside this crate; a
//! tracing-backed debug writer ships here so the ingester can run without a
//! downstream.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use anthracite_protocol::{Datapoint, MappingRule, StoragePolicy, Tag, TimeUnit};

/// Failure reported by a downstream writer.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("downstream rejected write: {0}")]
    Rejected(String),

    #[error("downstream unavailable: {0}")]
    Unavailable(String),

    #[error("write cancelled")]
    Cancelled,
}

/// Per-write instructions for the downsampler-and-writer.
///
/// Both overrides set to true tells the sink to skip its default
/// downsampling and namespace selection entirely and use only the mapping
/// rules and storage policies carried here. Exactly one of the two slices is
/// non-empty per matched rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions<'a> {
    pub downsample_override: bool,
    pub write_override: bool,
    pub mapping_rules: &'a [MappingRule],
    pub storage_policies: &'a [StoragePolicy],
}

/// Downstream downsampler-and-writer.
///
/// Contract: by the time `write` returns, anything the implementation needs
/// beyond the call has been copied, so the caller may immediately recycle
/// every buffer it passed in. The cancellation token is process-wide; the
/// writer's own timeouts govern individual calls.
#[async_trait]
pub trait Writer: Send + Sync {
    async fn write(
        &self,
        ctx: &CancellationToken,
        tags: &[Tag],
        datapoints: &[Datapoint],
        unit: TimeUnit,
        annotation: Option<&[u8]>,
        opts: WriteOptions<'_>,
    ) -> Result<(), WriteError>;
}

/// Writer that logs every write at debug level and succeeds.
///
/// Default wiring for running the ingester standalone.
#[derive(Debug, Default)]
pub struct DebugWriter;

#[async_trait]
impl Writer for DebugWriter {
    async fn write(
        &self,
        _ctx: &CancellationToken,
        tags: &[Tag],
        datapoints: &[Datapoint],
        _unit: TimeUnit,
        _annotation: Option<&[u8]>,
        opts: WriteOptions<'_>,
    ) -> Result<(), WriteError> {
        tracing::debug!(
            tags = ?tags,
            datapoints = ?datapoints,
            mapping_rules = ?opts.mapping_rules,
            storage_policies = ?opts.storage_policies,
            "debug writer received metric"
        );
        Ok(())
    }
}
