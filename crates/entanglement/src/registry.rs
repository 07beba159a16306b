//! The entanglement rule registry (`spec.md` §4.6).
//!
//! Rules are stored as an atomically-swappable list (`spec.md` §4.1
//! "EntanglementRule: static config (hot-reload permitted but treated as
//! atomic swap of the rules set)"), evaluated in insertion order, with
//! candidate related keys deduplicated and ranked by rule strength.

use std::sync::Arc;

use arc_swap::ArcSwap;

use horizon_core::Key;

use crate::rule::EntanglementRule;

/// One candidate related key, ranked for prefetch scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedKey {
    /// The related key itself.
    pub key: Key,
    /// The strength of the rule that produced it (highest wins on
    /// duplicates).
    pub strength: f32,
}

/// Holds the current rule set and resolves related keys for a probe key.
pub struct Registry {
    rules: ArcSwap<Vec<EntanglementRule>>,
}

impl Registry {
    /// Construct a registry from an initial rule set.
    pub fn new(rules: Vec<EntanglementRule>) -> Self {
        Registry {
            rules: ArcSwap::from_pointee(rules),
        }
    }

    /// Atomically replace the whole rule set.
    pub fn reload(&self, rules: Vec<EntanglementRule>) {
        self.rules.store(Arc::new(rules));
    }

    /// Number of configured rules.
    pub fn rule_count(&self) -> usize {
        self.rules.load().len()
    }

    /// Resolve every related key for `key`, across all matching rules in
    /// insertion order, deduplicated (keeping the highest strength seen
    /// per key), and sorted by descending strength so the prefetcher can
    /// schedule the most valuable candidates first.
    pub fn resolve(&self, key: &Key) -> Vec<RelatedKey> {
        let rules = self.rules.load();
        let mut by_key: Vec<RelatedKey> = Vec::new();

        for rule in rules.iter() {
            for related in rule.expand(key) {
                if let Some(existing) = by_key.iter_mut().find(|r| r.key == related) {
                    if rule.strength > existing.strength {
                        existing.strength = rule.strength;
                    }
                } else {
                    by_key.push(RelatedKey { key: related, strength: rule.strength });
                }
            }
        }

        by_key.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        by_key
    }
}
