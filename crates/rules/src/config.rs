//! Carbon ingestion rule configuration.
//!
//! Rules are evaluated in order; the first matching rule wins unless it sets
//! `continue`, in which case later rules keep being evaluated and every
//! additional match produces an independent write.
//!
//! # Example
//!
//! ```yaml
//! rewrite:
//!   cleanup: true
//! rules:
//!   - contains: cpu
//!     continue: true
//!     policies:
//!       - resolution: 1m
//!         retention: 1d
//!   - pattern: ".*"
//!     aggregation:
//!       enabled: false
//!     policies:
//!       - resolution: 10s
//!         retention: 6h
//! ```

use std::time::Duration;

use serde::Deserialize;

use anthracite_protocol::{
    AggregationKind, ClusterNamespace, MetricsType, RewriteConfig, MATCH_ALL_PATTERN,
};

/// Configuration for the carbon ingester's rule engine.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngesterConfig {
    /// Ingestion rules, evaluated in configuration order.
    pub rules: Vec<RuleConfig>,

    /// Rewrite applied to metric names before matching.
    pub rewrite: RewriteConfig,
}

impl IngesterConfig {
    /// Configured rules, or a synthesized catch-all when none are configured.
    ///
    /// The synthesized rule writes every metric, without aggregation, to
    /// every aggregated namespace present in the topology. Returns an empty
    /// list when there is nothing to synthesize from.
    pub fn rules_or_default(&self, namespaces: &[ClusterNamespace]) -> Vec<RuleConfig> {
        if !self.rules.is_empty() {
            return self.rules.clone();
        }

        let policies: Vec<StoragePolicyConfig> = namespaces
            .iter()
            .filter(|ns| ns.attributes.metrics_type == MetricsType::Aggregated)
            .map(|ns| StoragePolicyConfig {
                resolution: ns.attributes.resolution,
                retention: ns.attributes.retention,
            })
            .collect();

        if policies.is_empty() {
            return Vec::new();
        }

        vec![RuleConfig {
            pattern: MATCH_ALL_PATTERN.to_string(),
            aggregation: AggregationConfig {
                enabled: Some(false),
                kind: None,
            },
            policies,
            ..Default::default()
        }]
    }
}

/// A single carbon ingestion rule.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuleConfig {
    /// Regular expression matched against the full metric name.
    pub pattern: String,

    /// Substring matched against the metric name.
    /// Mutually exclusive with `pattern`.
    pub contains: String,

    /// Keep evaluating later rules after this one matches.
    #[serde(rename = "continue")]
    pub continue_matching: bool,

    /// Aggregation behavior for matched metrics.
    pub aggregation: AggregationConfig,

    /// Namespaces matched metrics are written to.
    pub policies: Vec<StoragePolicyConfig>,
}

/// Aggregation behavior for a rule.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    /// Whether matched metrics are aggregated downstream. Defaults to true.
    pub enabled: Option<bool>,

    /// Aggregation function. Defaults to mean.
    #[serde(rename = "type")]
    pub kind: Option<AggregationKind>,
}

impl AggregationConfig {
    pub fn enabled_or_default(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn kind_or_default(&self) -> AggregationKind {
        self.kind.unwrap_or_default()
    }
}

/// Resolution/retention pair a rule writes to.
///
/// Field order gives the derived `Ord` the (resolution, retention) sort the
/// validator relies on for adjacency-based duplicate detection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoragePolicyConfig {
    #[serde(with = "humantime_serde")]
    pub resolution: Duration,

    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
