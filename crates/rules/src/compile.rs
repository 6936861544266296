//! Compilation of configured rules into matchers and resolved policies.
//!
//! Compiled once per topology update so the per-metric hot path does no
//! pattern compilation and no policy construction. Input order is preserved:
//! the first compiled rule that matches takes precedence.

use std::fmt;

use memchr::memmem;
use regex::bytes::Regex;

use anthracite_protocol::{MappingRule, StoragePolicy, MATCH_ALL_PATTERN};

use crate::config::RuleConfig;
use crate::error::RuleError;

/// Pre-compiled matcher for one rule.
pub enum RuleMatcher {
    /// Matches every name without evaluation.
    All,

    /// Regular expression over the raw name bytes.
    Regex(Regex),

    /// Pre-built substring searcher over the raw name bytes.
    Contains(memmem::Finder<'static>),
}

impl RuleMatcher {
    /// Test a metric name against this matcher.
    #[inline]
    pub fn matches(&self, name: &[u8]) -> bool {
        match self {
            RuleMatcher::All => true,
            RuleMatcher::Regex(re) => re.is_match(name),
            RuleMatcher::Contains(finder) => finder.find(name).is_some(),
        }
    }
}

impl fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleMatcher::All => write!(f, "All"),
            RuleMatcher::Regex(re) => write!(f, "Regex({})", re.as_str()),
            RuleMatcher::Contains(finder) => {
                write!(f, "Contains({})", String::from_utf8_lossy(finder.needle()))
            }
        }
    }
}

/// A rule ready for per-metric evaluation.
///
/// Exactly one of `mapping_rules` and `storage_policies` is non-empty:
/// mapping rules when the rule aggregates, bare storage policies when it
/// does not.
#[derive(Debug)]
pub struct CompiledRule {
    pub config: RuleConfig,
    pub matcher: RuleMatcher,
    pub mapping_rules: Vec<MappingRule>,
    pub storage_policies: Vec<StoragePolicy>,
}

impl CompiledRule {
    #[inline]
    pub fn matches(&self, name: &[u8]) -> bool {
        self.matcher.matches(name)
    }
}

/// Compile rules in configuration order.
pub fn compile_rules(rules: &[RuleConfig]) -> Result<Vec<CompiledRule>, RuleError> {
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        compiled.push(compile_rule(rule)?);
    }
    Ok(compiled)
}

fn compile_rule(rule: &RuleConfig) -> Result<CompiledRule, RuleError> {
    if !rule.pattern.is_empty() && !rule.contains.is_empty() {
        return Err(RuleError::MixedMatchers {
            pattern: rule.pattern.clone(),
            contains: rule.contains.clone(),
        });
    }

    let matcher = if !rule.contains.is_empty() {
        RuleMatcher::Contains(memmem::Finder::new(rule.contains.as_bytes()).into_owned())
    } else if rule.pattern == MATCH_ALL_PATTERN {
        // The match-all token short-circuits regex evaluation; compiling it
        // as a regex would behave identically.
        RuleMatcher::All
    } else {
        RuleMatcher::Regex(Regex::new(&rule.pattern)?)
    };

    let storage_policies: Vec<StoragePolicy> = rule
        .policies
        .iter()
        .map(|p| StoragePolicy::new(p.resolution, p.retention))
        .collect();

    let mut compiled = CompiledRule {
        config: rule.clone(),
        matcher,
        mapping_rules: Vec::new(),
        storage_policies: Vec::new(),
    };

    if rule.aggregation.enabled_or_default() {
        compiled.mapping_rules = vec![MappingRule {
            aggregations: vec![rule.aggregation.kind_or_default()],
            storage_policies,
        }];
    } else {
        compiled.storage_policies = storage_policies;
    }

    Ok(compiled)
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod compile_test;
