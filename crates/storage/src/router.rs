//! Key-to-shard routing (`spec.md` §4.2 "Routing policies").
//!
//! Four policies decide which shard a *new* key lands on:
//! - `Hash`: pure function of the key, stateless, always reproducible.
//! - `Locality`: pure function of the key's first `:`-delimited segment,
//!   so related keys (`user:42:profile`, `user:42:settings`) land
//!   together.
//! - `LoadBalanced`: picks the candidate shard with the smallest current
//!   data count (ties broken by hash order), recorded as a sticky
//!   override so later lookups agree.
//! - `Gravitational`: picks the highest-mass candidate shard (the one
//!   already attracting related traffic), also sticky.
//!
//! Once a key has been placed, routing must stay stable until an explicit
//! migration moves it (`spec.md` §4.2 "routing stability"). `Hash` and
//! `Locality` are stable by construction; `LoadBalanced` and
//! `Gravitational` achieve stability through an explicit override table
//! that is consulted before recomputing a policy.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_64;

use horizon_core::Key;

use crate::shard::Shard;

/// Which algorithm decides placement for keys not already overridden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingPolicy {
    /// Stateless hash of the whole key.
    Hash,
    /// Stateless hash of the key's first `:`-segment.
    Locality,
    /// Sticky placement on the least-loaded candidate shard.
    LoadBalanced,
    /// Sticky placement on the highest-mass candidate shard.
    Gravitational,
}

/// Copy-on-write routing overrides: keys whose shard was decided by a
/// sticky policy or moved by migration, rather than computed fresh every
/// lookup.
#[derive(Debug, Clone, Default)]
struct RoutingTable {
    overrides: FxHashMap<Key, u16>,
}

/// Candidate shards considered by `LoadBalanced`/`Gravitational` for a
/// given key, derived by hashing the key with `CANDIDATES` distinct
/// seeds (rendezvous-style), so the search space stays bounded
/// regardless of shard count.
const CANDIDATES: usize = 3;

/// Routes keys to shards and tracks sticky overrides.
pub struct Router {
    policy: RoutingPolicy,
    num_shards: u16,
    table: ArcSwap<RoutingTable>,
    masses: ArcSwap<Vec<f32>>,
    counts: ArcSwap<Vec<usize>>,
}

impl Router {
    /// Construct a router for `num_shards` shards, all masses and data
    /// counts starting at zero.
    pub fn new(policy: RoutingPolicy, num_shards: u16) -> Self {
        Router {
            policy,
            num_shards,
            table: ArcSwap::from_pointee(RoutingTable::default()),
            masses: ArcSwap::from_pointee(vec![0.0; num_shards as usize]),
            counts: ArcSwap::from_pointee(vec![0; num_shards as usize]),
        }
    }

    /// Total number of shards this router spans.
    pub fn num_shards(&self) -> u16 {
        self.num_shards
    }

    /// Replace the full mass vector, as published by the entropy sampler.
    /// `Gravitational` routes by mass (activity), not key count.
    pub fn update_masses(&self, masses: Vec<f32>) {
        debug_assert_eq!(masses.len(), self.num_shards as usize);
        self.masses.store(Arc::new(masses));
    }

    /// Replace the full per-shard key-count vector. `LoadBalanced` routes
    /// by this (`spec.md` §4.2 "the shard with the smallest current data
    /// count; ties broken by hash"), not by mass.
    pub fn update_counts(&self, counts: Vec<usize>) {
        debug_assert_eq!(counts.len(), self.num_shards as usize);
        self.counts.store(Arc::new(counts));
    }

    fn natural_shard(&self, key: &Key) -> u16 {
        (xxh3_64(key.as_bytes()) % self.num_shards as u64) as u16
    }

    fn locality_shard(&self, key: &Key) -> u16 {
        let first = key.segments().next().unwrap_or_else(|| key.as_bytes());
        (xxh3_64(first) % self.num_shards as u64) as u16
    }

    fn candidates(&self, key: &Key) -> Vec<u16> {
        (0..CANDIDATES as u64)
            .map(|seed| {
                let mut bytes = key.as_bytes().to_vec();
                bytes.extend_from_slice(&seed.to_le_bytes());
                (xxh3_64(&bytes) % self.num_shards as u64) as u16
            })
            .collect()
    }

    /// Route `key` to the shard it currently belongs to (or should be
    /// placed on, for a key never seen before).
    pub fn route(&self, key: &Key) -> u16 {
        if let Some(&shard_id) = self.table.load().overrides.get(key) {
            return shard_id;
        }

        match self.policy {
            RoutingPolicy::Hash => self.natural_shard(key),
            RoutingPolicy::Locality => self.locality_shard(key),
            RoutingPolicy::LoadBalanced => {
                let counts = self.counts.load();
                // Smallest current data count among the candidates; a tie
                // keeps the first candidate, i.e. the one the lowest-seed
                // hash produced (`spec.md` §4.2 "ties broken by hash").
                let chosen = self
                    .candidates(key)
                    .into_iter()
                    .min_by_key(|c| counts[*c as usize])
                    .unwrap_or_else(|| self.natural_shard(key));
                self.record_override(key.clone(), chosen);
                chosen
            }
            RoutingPolicy::Gravitational => {
                let masses = self.masses.load();
                let chosen = self
                    .candidates(key)
                    .into_iter()
                    .max_by(|a, b| {
                        masses[*a as usize]
                            .partial_cmp(&masses[*b as usize])
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or_else(|| self.natural_shard(key));
                self.record_override(key.clone(), chosen);
                chosen
            }
        }
    }

    /// Rebuild sticky overrides from where keys actually live on disk,
    /// restoring placement across a restart (`spec.md` §4.2 "once a key
    /// is placed, its owning shard is recorded... subsequent GET/DELETE
    /// do not re-route").
    ///
    /// `route`'s own overrides live only in memory, so a fresh `Router`
    /// after `open()` knows nothing about explicit `override_shard`
    /// writes, prior `LoadBalanced`/`Gravitational` placements, or
    /// completed migrations — it would recompute a (possibly different)
    /// shard for a key whose data physically sits elsewhere. Called once
    /// after every shard has replayed its WAL and before the router is
    /// used for routing.
    ///
    /// `Hash`/`Locality` are pure functions of the key, so a resident key
    /// only needs an override when it sits somewhere other than its
    /// policy-computed shard. `LoadBalanced`/`Gravitational` have no pure
    /// placement function at all — wherever a key landed was a one-time
    /// decision — so every resident key under those policies gets an
    /// override unconditionally.
    pub fn reconcile_overrides(&self, shards: &[Arc<Shard>]) {
        let mut overrides: FxHashMap<Key, u16> = FxHashMap::default();
        for shard in shards {
            for key in shard.snapshot_keys() {
                let needs_override = match self.policy {
                    RoutingPolicy::Hash => self.natural_shard(&key) != shard.id(),
                    RoutingPolicy::Locality => self.locality_shard(&key) != shard.id(),
                    RoutingPolicy::LoadBalanced | RoutingPolicy::Gravitational => true,
                };
                if needs_override {
                    overrides.insert(key, shard.id());
                }
            }
        }
        self.table.store(Arc::new(RoutingTable { overrides }));
    }

    /// Record a sticky override for `key`, copy-on-write over the whole
    /// table. Called both by `route` (first sticky placement) and by
    /// migration (explicit move).
    pub fn record_override(&self, key: Key, shard_id: u16) {
        let current = self.table.load();
        let mut overrides: FxHashMap<Key, u16> = current.overrides.clone();
        overrides.insert(key, shard_id);
        self.table.store(Arc::new(RoutingTable { overrides }));
    }

    /// Remove a key's override, reverting it to policy-computed routing
    /// (used when a migration's effects are rolled back).
    pub fn clear_override(&self, key: &Key) {
        let current = self.table.load();
        if !current.overrides.contains_key(key) {
            return;
        }
        let mut overrides = current.overrides.clone();
        overrides.remove(key);
        self.table.store(Arc::new(RoutingTable { overrides }));
    }

    /// Number of keys currently holding an explicit override, for
    /// diagnostics.
    pub fn override_count(&self) -> usize {
        self.table.load().overrides.len()
    }

    /// Snapshot current masses, for the entropy monitor's imbalance
    /// calculation.
    pub fn masses(&self) -> Vec<f32> {
        self.masses.load().as_ref().clone()
    }

    /// Histogram of how many keys route naturally to each shard under
    /// `Hash`/`Locality`, ignoring overrides — used by the entropy
    /// monitor's Shannon-entropy computation over a sampled key set.
    pub fn natural_distribution<'a>(&self, keys: impl Iterator<Item = &'a Key>) -> HashMap<u16, u64> {
        let mut hist = HashMap::new();
        for key in keys {
            let shard = match self.policy {
                RoutingPolicy::Locality => self.locality_shard(key),
                _ => self.natural_shard(key),
            };
            *hist.entry(shard).or_insert(0u64) += 1;
        }
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_core::{Limits, TierHint, Value};
    use horizon_wal::DurabilityMode;
    use tempfile::tempdir;

    fn key(s: &str) -> Key {
        Key::try_from(s).unwrap()
    }

    fn open_shards(dir: &std::path::Path, n: u16) -> Vec<Arc<Shard>> {
        (0..n)
            .map(|id| Arc::new(Shard::open(id, dir.join(format!("shard_{id:02}")), Limits::default(), DurabilityMode::Sync).unwrap()))
            .collect()
    }

    #[test]
    fn hash_routing_is_deterministic() {
        let router = Router::new(RoutingPolicy::Hash, 8);
        let k = key("user:42");
        assert_eq!(router.route(&k), router.route(&k));
    }

    #[test]
    fn locality_routes_shared_prefix_to_same_shard() {
        let router = Router::new(RoutingPolicy::Locality, 8);
        let a = key("user:42:profile");
        let b = key("user:42:settings");
        assert_eq!(router.route(&a), router.route(&b));
    }

    #[test]
    fn load_balanced_is_sticky_after_first_route() {
        let router = Router::new(RoutingPolicy::LoadBalanced, 4);
        let k = key("hot-key");
        let first = router.route(&k);
        router.update_counts(vec![100, 0, 0, 0]);
        let second = router.route(&k);
        assert_eq!(first, second);
    }

    #[test]
    fn load_balanced_prefers_least_loaded_candidate_for_new_key() {
        let router = Router::new(RoutingPolicy::LoadBalanced, 4);
        router.update_counts(vec![1000, 1000, 1000, 0]);
        // Try several keys; at least one candidate set should include
        // shard 3, which is always the least loaded.
        let mut saw_shard_three = false;
        for i in 0..20 {
            let k = key(&format!("k{i}"));
            if router.route(&k) == 3 {
                saw_shard_three = true;
            }
        }
        assert!(saw_shard_three);
    }

    #[test]
    fn explicit_override_takes_priority_over_policy() {
        let router = Router::new(RoutingPolicy::Hash, 8);
        let k = key("user:42");
        let natural = router.route(&k);
        let forced = (natural + 1) % 8;
        router.record_override(k.clone(), forced);
        assert_eq!(router.route(&k), forced);
    }

    #[test]
    fn clear_override_reverts_to_natural_shard() {
        let router = Router::new(RoutingPolicy::Hash, 8);
        let k = key("user:42");
        let natural = router.route(&k);
        router.record_override(k.clone(), (natural + 1) % 8);
        router.clear_override(&k);
        assert_eq!(router.route(&k), natural);
    }

    #[test]
    fn natural_distribution_counts_every_key_once() {
        let router = Router::new(RoutingPolicy::Hash, 4);
        let keys = vec![key("a"), key("b"), key("c")];
        let hist = router.natural_distribution(keys.iter());
        assert_eq!(hist.values().sum::<u64>(), 3);
    }

    #[test]
    fn reconcile_restores_an_explicit_override_across_a_fresh_router() {
        let dir = tempdir().unwrap();
        let shards = open_shards(dir.path(), 4);

        let router = Router::new(RoutingPolicy::Hash, 4);
        let k = key("forced-key");
        let natural = router.route(&k);
        let forced = (natural + 1) % 4;
        shards[forced as usize].put(k.clone(), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();

        // A brand new router, as constructed on `Engine::open()`, knows
        // nothing about the forced placement above.
        let fresh = Router::new(RoutingPolicy::Hash, 4);
        assert_eq!(fresh.route(&k), natural);

        fresh.reconcile_overrides(&shards);
        assert_eq!(fresh.route(&k), forced);
    }

    #[test]
    fn reconcile_leaves_naturally_placed_keys_unoverridden() {
        let dir = tempdir().unwrap();
        let shards = open_shards(dir.path(), 4);
        let router = Router::new(RoutingPolicy::Hash, 4);

        let k = key("plain-key");
        let natural = router.route(&k);
        shards[natural as usize].put(k.clone(), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();

        router.reconcile_overrides(&shards);
        assert_eq!(router.override_count(), 0);
        assert_eq!(router.route(&k), natural);
    }

    #[test]
    fn reconcile_always_overrides_load_balanced_residents() {
        let dir = tempdir().unwrap();
        let shards = open_shards(dir.path(), 4);
        let k = key("sticky-key");
        shards[2].put(k.clone(), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();

        let router = Router::new(RoutingPolicy::LoadBalanced, 4);
        router.reconcile_overrides(&shards);
        assert_eq!(router.route(&k), 2);
    }
}
