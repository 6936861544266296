//! Hot-swappable active rule set.
//!
//! Readers take an `Arc` snapshot that stays consistent for the whole match;
//! the update path serializes {validate, compile, swap} under a mutex and
//! publishes copy-on-write, so a failed update leaves the previous snapshot
//! untouched and never blocks readers beyond the load.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use anthracite_protocol::ClusterNamespace;

use crate::compile::{compile_rules, CompiledRule};
use crate::config::IngesterConfig;
use crate::validate::{aggregated_namespaces, validate_rules};

/// The active compiled rule set.
pub struct RuleSet {
    compiled: ArcSwap<Vec<CompiledRule>>,

    /// Serializes topology updates. Readers never take this.
    update: Mutex<()>,
}

impl RuleSet {
    /// An empty rule set. Nothing matches until the first successful update.
    pub fn new() -> Self {
        Self {
            compiled: ArcSwap::from_pointee(Vec::new()),
            update: Mutex::new(()),
        }
    }

    /// Current compiled rules.
    ///
    /// The snapshot is immutable and stays valid for as long as the caller
    /// holds it, regardless of concurrent updates.
    #[inline]
    pub fn snapshot(&self) -> Arc<Vec<CompiledRule>> {
        self.compiled.load_full()
    }

    /// Rebuild the active rules from config and the latest topology.
    ///
    /// Returns whether a new rule set was installed. Any validation or
    /// compilation failure retains the previously installed rules; the
    /// active set is never blanked.
    pub fn apply_update(
        &self,
        config: &IngesterConfig,
        namespaces: &[ClusterNamespace],
    ) -> bool {
        let _guard = self.update.lock();

        let by_ret_res = match aggregated_namespaces(namespaces) {
            Ok(map) => map,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "invalid namespace topology, keeping current carbon ingestion rules"
                );
                return false;
            }
        };

        let mut rules = config.rules_or_default(namespaces);
        if rules.is_empty() {
            let ids: Vec<&str> = namespaces.iter().map(|ns| ns.id.as_str()).collect();
            tracing::warn!(
                namespaces = ?ids,
                "generated empty carbon ingestion rules from latest namespace update, \
                 keeping current rules"
            );
            return false;
        }

        if let Err(err) = validate_rules(&mut rules, &by_ret_res) {
            tracing::error!(
                error = %err,
                "carbon ingestion rules failed topology validation, keeping current rules"
            );
            return false;
        }

        if config.rules.is_empty() {
            tracing::info!(
                "no carbon ingestion rules configured, all metrics will be written to all \
                 aggregated namespaces"
            );
        }

        match compile_rules(&rules) {
            Ok(compiled) => {
                self.compiled.store(Arc::new(compiled));
                true
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    "failed to compile carbon ingestion rules, keeping current rules"
                );
                false
            }
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "set_test.rs"]
mod set_test;
