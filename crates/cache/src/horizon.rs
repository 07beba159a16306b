//! The Event Horizon cache: four tiers coordinated as one unit
//! (`spec.md` §4.3).
//!
//! Tiers are shared across shards (`spec.md` §3 "The Cache tiers are
//! shared across shards; each tier exclusively owns its storage and
//! eviction queue"). A write-through `put` lands in the tier its access
//! pattern hints at; a demoted or evicted entry cascades one tier down
//! (`Hot` -> `Warm` -> `Cold` -> `Universal`), and falling out of
//! `Universal` simply discards the entry, since the shard remains the
//! source of truth (`spec.md` §4.3 "Removed entries do not affect
//! durability").

use horizon_core::{Consistency, Key, TierHint, Value};

use crate::tier::{Tier, TierCapacity, TierName};

/// Where a `get` found its value, for metrics/diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupSource {
    /// Served from a cache tier without touching the shard.
    Cache,
    /// Not found in any tier; caller must consult the shard.
    Miss,
}

/// Per-tier capacity configuration for the whole cache.
#[derive(Debug, Clone, Copy)]
pub struct HorizonCapacities {
    /// Hot tier capacity.
    pub hot: TierCapacity,
    /// Warm tier capacity.
    pub warm: TierCapacity,
    /// Cold tier capacity.
    pub cold: TierCapacity,
    /// Universal (fallback) tier capacity.
    pub universal: TierCapacity,
}

impl Default for HorizonCapacities {
    fn default() -> Self {
        HorizonCapacities {
            hot: TierCapacity { capacity_bytes: 64 * 1024 * 1024, capacity_entries: 100_000 },
            warm: TierCapacity { capacity_bytes: 128 * 1024 * 1024, capacity_entries: 250_000 },
            cold: TierCapacity { capacity_bytes: 256 * 1024 * 1024, capacity_entries: 500_000 },
            universal: TierCapacity { capacity_bytes: 512 * 1024 * 1024, capacity_entries: 1_000_000 },
        }
    }
}

/// The coordinated four-tier cache.
pub struct EventHorizon {
    hot: Tier,
    warm: Tier,
    cold: Tier,
    universal: Tier,
}

impl EventHorizon {
    /// Construct an empty cache with the given per-tier capacities.
    pub fn new(capacities: HorizonCapacities) -> Self {
        EventHorizon {
            hot: Tier::new(TierName::Hot, capacities.hot),
            warm: Tier::new(TierName::Warm, capacities.warm),
            cold: Tier::new(TierName::Cold, capacities.cold),
            universal: Tier::new(TierName::Universal, capacities.universal),
        }
    }

    fn tier(&self, name: TierName) -> &Tier {
        match name {
            TierName::Hot => &self.hot,
            TierName::Warm => &self.warm,
            TierName::Cold => &self.cold,
            TierName::Universal => &self.universal,
        }
    }

    fn next_tier_down(name: TierName) -> Option<TierName> {
        match name {
            TierName::Hot => Some(TierName::Warm),
            TierName::Warm => Some(TierName::Cold),
            TierName::Cold => Some(TierName::Universal),
            TierName::Universal => None,
        }
    }

    fn next_tier_up(name: TierName) -> Option<TierName> {
        match name {
            TierName::Hot => None,
            TierName::Warm => Some(TierName::Hot),
            TierName::Cold => Some(TierName::Warm),
            TierName::Universal => Some(TierName::Cold),
        }
    }

    /// Write `key` -> `value` through to the tier `hint` selects,
    /// cascading any evicted entries down the tier chain.
    pub fn put(&self, key: Key, value: Value, hint: TierHint) {
        let target = match hint {
            TierHint::Hot => TierName::Hot,
            TierHint::Warm => TierName::Warm,
            TierHint::Cold => TierName::Cold,
        };

        // Writing a fresh value for a key invalidates any stale copy a
        // different tier might still be holding.
        self.invalidate_other_tiers(&key, target);

        let evicted = self.tier(target).insert(key, value);
        self.cascade(target, evicted);
    }

    fn invalidate_other_tiers(&self, key: &Key, except: TierName) {
        for name in [TierName::Hot, TierName::Warm, TierName::Cold, TierName::Universal] {
            if name != except {
                self.tier(name).remove(key);
            }
        }
    }

    fn cascade(&self, from: TierName, evicted: Vec<crate::entry::CacheEntry>) {
        let Some(down) = Self::next_tier_down(from) else {
            return;
        };
        for entry in evicted {
            let further = self.tier(down).insert(entry.key, entry.value);
            self.cascade(down, further);
        }
    }

    /// Look up `key` across all tiers, promoting on threshold crossing
    /// and honoring `consistency` (`CachedOk` serves any cached copy;
    /// `Latest` still serves from cache here -- the engine facade is
    /// responsible for validating against the shard's version when it
    /// requires `Latest` semantics, per `spec.md` §4.3's cache/shard
    /// consistency contract).
    pub fn get(&self, key: &Key, _consistency: Consistency) -> (Option<Value>, LookupSource) {
        for name in [TierName::Hot, TierName::Warm, TierName::Cold, TierName::Universal] {
            if let Some((value, should_promote)) = self.tier(name).get(key) {
                if should_promote {
                    if let Some(up) = Self::next_tier_up(name) {
                        self.tier(name).remove(key);
                        let evicted = self.tier(up).insert(key.clone(), value.clone());
                        self.cascade(up, evicted);
                    }
                }
                return (Some(value), LookupSource::Cache);
            }
        }
        (None, LookupSource::Miss)
    }

    /// Invalidate `key` everywhere (used on delete).
    pub fn invalidate(&self, key: &Key) {
        for name in [TierName::Hot, TierName::Warm, TierName::Cold, TierName::Universal] {
            self.tier(name).remove(key);
        }
    }

    /// Per-tier byte/entry occupancy, for `metrics()`.
    pub fn snapshot(&self) -> HorizonSnapshot {
        HorizonSnapshot {
            hot_bytes: self.hot.bytes_used(),
            hot_entries: self.hot.len(),
            warm_bytes: self.warm.bytes_used(),
            warm_entries: self.warm.len(),
            cold_bytes: self.cold.bytes_used(),
            cold_entries: self.cold.len(),
            universal_bytes: self.universal.bytes_used(),
            universal_entries: self.universal.len(),
        }
    }
}

/// A point-in-time read of every tier's occupancy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HorizonSnapshot {
    /// Hot tier resident bytes.
    pub hot_bytes: u64,
    /// Hot tier resident entries.
    pub hot_entries: usize,
    /// Warm tier resident bytes.
    pub warm_bytes: u64,
    /// Warm tier resident entries.
    pub warm_entries: usize,
    /// Cold tier resident bytes.
    pub cold_bytes: u64,
    /// Cold tier resident entries.
    pub cold_entries: usize,
    /// Universal tier resident bytes.
    pub universal_bytes: u64,
    /// Universal tier resident entries.
    pub universal_entries: usize,
}
