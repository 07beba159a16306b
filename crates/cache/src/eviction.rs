//! Composite eviction scoring (`spec.md` §4.3 "composite score =
//! f(age, size, tier priority)"; exact weights and tier priorities are an
//! Open Question the spec leaves to configuration, decided in
//! `SPEC_FULL.md`).

use crate::tier::TierName;

/// Weights combining into a single eviction score. Lower score evicts
/// first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionWeights {
    /// Weight applied to normalized age (time since last access).
    pub w_age: f32,
    /// Weight applied to normalized size.
    pub w_size: f32,
    /// Weight applied to the tier's priority (subtracted, so a
    /// higher-priority tier's entries score higher and survive longer).
    pub w_tier: f32,
}

impl Default for EvictionWeights {
    fn default() -> Self {
        EvictionWeights {
            w_age: 1.0,
            w_size: 1.0,
            w_tier: 2.0,
        }
    }
}

/// Relative importance of a tier, used as the `-w_tier * tier_priority`
/// term in the composite score. Hot entries are the least willing to be
/// evicted; Universal (the catch-all fallback tier) is the most willing.
pub fn tier_priority(tier: TierName) -> f32 {
    match tier {
        TierName::Hot => 3.0,
        TierName::Warm => 2.0,
        TierName::Cold => 1.0,
        TierName::Universal => 0.0,
    }
}

/// Compute a composite eviction score for one entry. Callers normalize
/// `age_ns` and `size` against the maximum observed in the candidate set
/// before calling this, so the three terms are comparable.
///
/// Lower scores are evicted first: older and larger entries score lower
/// (more eviction-worthy), while higher tier priority raises the score
/// (makes eviction less likely).
pub fn composite_score(age_norm: f32, size_norm: f32, tier: TierName, weights: EvictionWeights) -> f32 {
    weights.w_age * age_norm + weights.w_size * size_norm - weights.w_tier * tier_priority(tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_entry_scores_lower_than_fresher_one() {
        let weights = EvictionWeights::default();
        let old = composite_score(1.0, 0.0, TierName::Warm, weights);
        let fresh = composite_score(0.0, 0.0, TierName::Warm, weights);
        assert!(old < fresh);
    }

    #[test]
    fn hot_tier_outranks_universal_at_equal_age_and_size() {
        let weights = EvictionWeights::default();
        let hot = composite_score(0.5, 0.5, TierName::Hot, weights);
        let universal = composite_score(0.5, 0.5, TierName::Universal, weights);
        assert!(hot > universal, "hot entries should be harder to evict");
    }

    #[test]
    fn tier_priority_orders_hot_above_warm_above_cold_above_universal() {
        assert!(tier_priority(TierName::Hot) > tier_priority(TierName::Warm));
        assert!(tier_priority(TierName::Warm) > tier_priority(TierName::Cold));
        assert!(tier_priority(TierName::Cold) > tier_priority(TierName::Universal));
    }
}
