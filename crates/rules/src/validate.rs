//! Reconciliation of configured rule policies against the live namespace
//! topology.
//!
//! Runs before compilation on every topology update. Any error here means
//! the update is discarded and the previously installed rules stay active.

use std::collections::HashMap;

use anthracite_protocol::{ClusterNamespace, MetricsType, RetentionResolution};

use crate::config::{RuleConfig, StoragePolicyConfig};
use crate::error::TopologyError;

/// Index aggregated namespaces by their (resolution, retention) identity.
///
/// Namespaces with any other metrics type are ignored. Two aggregated
/// namespaces sharing an identity is a fatal topology error.
pub fn aggregated_namespaces(
    namespaces: &[ClusterNamespace],
) -> Result<HashMap<RetentionResolution, &ClusterNamespace>, TopologyError> {
    let mut by_ret_res = HashMap::with_capacity(namespaces.len());
    for ns in namespaces {
        if ns.attributes.metrics_type != MetricsType::Aggregated {
            continue;
        }
        let key = RetentionResolution {
            resolution: ns.attributes.resolution,
            retention: ns.attributes.retention,
        };
        if by_ret_res.insert(key, ns).is_some() {
            return Err(TopologyError::DuplicateNamespace {
                resolution: key.resolution,
                retention: key.retention,
            });
        }
    }
    Ok(by_ret_res)
}

/// Validate every rule's policies against the aggregated namespace set.
///
/// Sorts each rule's policies by (resolution, retention) so duplicates are
/// adjacent, then rejects:
/// - the same policy appearing twice in one rule
/// - two different resolutions in one rule with aggregation disabled
///   (without aggregation the ingester writes raw points and cannot serve
///   two resolutions at once)
/// - any policy whose identity has no aggregated namespace
pub fn validate_rules(
    rules: &mut [RuleConfig],
    by_ret_res: &HashMap<RetentionResolution, &ClusterNamespace>,
) -> Result<(), TopologyError> {
    for rule in rules.iter_mut() {
        rule.policies.sort();

        let mut last: Option<StoragePolicyConfig> = None;
        for policy in &rule.policies {
            if last == Some(*policy) {
                return Err(TopologyError::DuplicatePolicy {
                    pattern: rule.pattern.clone(),
                    resolution: policy.resolution,
                    retention: policy.retention,
                });
            }

            if let Some(prev) = last {
                if !rule.aggregation.enabled_or_default() && policy.resolution != prev.resolution {
                    return Err(TopologyError::MixedResolutions {
                        pattern: rule.pattern.clone(),
                    });
                }
            }

            let key = RetentionResolution {
                resolution: policy.resolution,
                retention: policy.retention,
            };
            if !by_ret_res.contains_key(&key) {
                return Err(TopologyError::UnknownNamespace {
                    resolution: policy.resolution,
                    retention: policy.retention,
                });
            }

            last = Some(*policy);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;
