//! Rule engine errors.

use std::time::Duration;

use thiserror::Error;

/// Rule compilation failure.
///
/// Surfaced at construction time for configured rules (the ingester never
/// starts) and at update time for topology-driven rebuilds (the previous
/// rule set stays active).
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule contains both pattern and contains: pattern={pattern}, contains={contains}")]
    MixedMatchers { pattern: String, contains: String },

    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Why a topology update could not produce a usable rule set.
///
/// Always non-fatal at runtime: the caller logs it and retains the
/// previously installed rules.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("namespaces with duplicate resolution {resolution:?} and retention {retention:?}")]
    DuplicateNamespace {
        resolution: Duration,
        retention: Duration,
    },

    #[error(
        "rule {pattern:?} includes storage policy {resolution:?}:{retention:?} more than once"
    )]
    DuplicatePolicy {
        pattern: String,
        resolution: Duration,
        retention: Duration,
    },

    #[error("rule {pattern:?} mixes storage policy resolutions with aggregation disabled")]
    MixedResolutions { pattern: String },

    #[error("no aggregated namespace matches storage policy {resolution:?}:{retention:?}")]
    UnknownNamespace {
        resolution: Duration,
        retention: Duration,
    },
}
