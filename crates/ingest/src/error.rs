//! Ingester construction errors.

use thiserror::Error;

/// Construction-time configuration failures.
///
/// The ingester never starts when one of these is returned; per-metric
/// failures at runtime are counted and logged instead of propagated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("carbon ingester options: worker pool must be set")]
    WorkerPoolNotSet,

    #[error("carbon ingester options: only a single worker pool can be set")]
    MultipleWorkerPools,
}

/// Any failure building an ingester.
#[derive(Debug, Error)]
pub enum IngesterError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Rules(#[from] anthracite_rules::RuleError),
}
