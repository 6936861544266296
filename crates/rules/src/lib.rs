//! Carbon ingestion rule engine.
//!
//! Turns configured rules plus the live cluster namespace topology into a
//! compiled, hot-swappable rule set:
//!
//! ```text
//! namespace watcher -> validate -> compile -> atomic swap
//! ```
//!
//! Matching is first-match-wins in configuration order, with an optional
//! `continue` cascade. A failed update (bad topology, bad pattern) always
//! retains the previously installed rules.

mod compile;
mod config;
mod error;
mod set;
mod validate;

pub use compile::{compile_rules, CompiledRule, RuleMatcher};
pub use config::{AggregationConfig, IngesterConfig, RuleConfig, StoragePolicyConfig};
pub use error::{RuleError, TopologyError};
pub use set::RuleSet;
pub use validate::{aggregated_namespaces, validate_rules};
