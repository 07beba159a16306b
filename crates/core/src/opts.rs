//! Per-operation options (`spec.md` §4.1).

use crate::record::TierHint;
use std::time::Duration;

/// Access pattern hint supplied with a `put`, steering both cache tier
/// placement and (for `Auto`) the router's gravitational policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    /// Hint that this key will be read frequently.
    Hot,
    /// Hint that this key has moderate read frequency.
    Warm,
    /// Hint that this key is rarely read.
    Cold,
    /// Let the engine infer placement from recent access statistics.
    Auto,
}

impl AccessPattern {
    /// Resolve an explicit tier hint, defaulting `Auto` to `Warm` (the
    /// engine refines this over time via promotion/demotion, see
    /// `horizon-cache`).
    pub fn resolve(self) -> TierHint {
        match self {
            AccessPattern::Hot => TierHint::Hot,
            AccessPattern::Warm => TierHint::Warm,
            AccessPattern::Cold => TierHint::Cold,
            AccessPattern::Auto => TierHint::Warm,
        }
    }
}

impl Default for AccessPattern {
    fn default() -> Self {
        AccessPattern::Auto
    }
}

/// Scheduling priority for a write, used to order pending WAL appends
/// during rotation backpressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Deferrable background writes (e.g. cache warmers, migrations).
    Background = 0,
    /// Ordinary application writes.
    Normal = 1,
    /// Must not be delayed behind other pending writes.
    Critical = 2,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Read freshness requirement for a `get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consistency {
    /// Always reflect the most recent committed write, bypassing or
    /// version-checking the cache.
    Latest,
    /// A cached value is acceptable even if stale.
    CachedOk,
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::Latest
    }
}

/// Options accepted by `put`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Cache/routing access-pattern hint.
    pub access_pattern: AccessPattern,
    /// Write scheduling priority.
    pub priority: Priority,
    /// Skip cache tier write-through for this write.
    pub skip_cache: bool,
    /// Force placement on a specific shard, bypassing the router policy.
    pub override_shard: Option<u16>,
    /// Optional deadline for the whole operation.
    pub deadline: Option<Duration>,
}

/// Options accepted by `get`.
#[derive(Debug, Clone, Copy)]
pub struct GetOptions {
    /// Whether to opportunistically prefetch entangled keys
    /// (`quantum_get` sets this internally; a plain `get` normally leaves
    /// it false).
    pub prefetch: bool,
    /// Read freshness requirement.
    pub consistency: Consistency,
    /// Optional deadline for the whole operation.
    pub deadline: Option<Duration>,
}

impl Default for GetOptions {
    fn default() -> Self {
        GetOptions {
            prefetch: false,
            consistency: Consistency::default(),
            deadline: None,
        }
    }
}
