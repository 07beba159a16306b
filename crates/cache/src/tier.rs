//! A single cache tier (`spec.md` §4.3 "Tiers: Hot, Warm, Cold,
//! Universal").

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use horizon_core::{Key, Timestamp, Value};

use crate::entry::CacheEntry;
use crate::eviction::{composite_score, EvictionWeights};

/// Which tier an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierName {
    /// Frequently accessed keys.
    Hot,
    /// Moderately accessed keys.
    Warm,
    /// Rarely accessed keys.
    Cold,
    /// Fallback tier for everything else.
    Universal,
}

/// Capacity configuration for one tier.
#[derive(Debug, Clone, Copy)]
pub struct TierCapacity {
    /// Maximum total bytes the tier may hold.
    pub capacity_bytes: usize,
    /// Maximum number of entries the tier may hold.
    pub capacity_entries: usize,
}

/// Access-count threshold at which a `Get` hit promotes an entry to the
/// next tier up (`spec.md` §4.3 "promote if access_count crosses a tier
/// threshold").
pub const DEFAULT_PROMOTE_THRESHOLD: u32 = 4;

/// A single bounded cache tier with its own storage and eviction queue
/// (`spec.md` §4.3 "each has capacity_bytes and capacity_entries").
pub struct Tier {
    name: TierName,
    capacity: TierCapacity,
    entries: DashMap<Key, CacheEntry>,
    bytes_used: AtomicU64,
    insert_seq: AtomicU64,
    promote_threshold: u32,
    weights: EvictionWeights,
}

impl Tier {
    /// Construct an empty tier.
    pub fn new(name: TierName, capacity: TierCapacity) -> Self {
        Tier {
            name,
            capacity,
            entries: DashMap::new(),
            bytes_used: AtomicU64::new(0),
            insert_seq: AtomicU64::new(0),
            promote_threshold: DEFAULT_PROMOTE_THRESHOLD,
            weights: EvictionWeights::default(),
        }
    }

    /// This tier's name.
    pub fn name(&self) -> TierName {
        self.name
    }

    /// Current resident bytes.
    pub fn bytes_used(&self) -> u64 {
        self.bytes_used.load(Ordering::Relaxed)
    }

    /// Current resident entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the tier holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`, touching its recency/access-count on hit. Returns
    /// the value and whether this access crossed the promotion threshold.
    pub fn get(&self, key: &Key) -> Option<(Value, bool)> {
        let now = Timestamp::now().as_nanos();
        let mut entry = self.entries.get_mut(key)?;
        entry.touch(now);
        let should_promote = entry.access_count == self.promote_threshold;
        Some((entry.value.clone(), should_promote))
    }

    /// Peek `key` without affecting recency (used by read-through checks
    /// that shouldn't perturb eviction order, e.g. cache warming).
    pub fn peek(&self, key: &Key) -> Option<Value> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Insert or overwrite `key` -> `value`, evicting as many victims as
    /// needed to respect capacity. Returns the evicted entries so the
    /// caller (the `EventHorizon` coordinator) can cascade them down to
    /// the next tier.
    pub fn insert(&self, key: Key, value: Value) -> Vec<CacheEntry> {
        let now = Timestamp::now().as_nanos();
        let seq = self.insert_seq.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(key.clone(), value, now, seq);
        let size = entry.size as u64;

        if let Some(old) = self.entries.insert(key, entry) {
            self.bytes_used.fetch_sub(old.size as u64, Ordering::Relaxed);
        }
        self.bytes_used.fetch_add(size, Ordering::Relaxed);

        self.evict_to_fit()
    }

    /// Remove `key`, if present (cache invalidation on delete).
    pub fn remove(&self, key: &Key) -> Option<CacheEntry> {
        let removed = self.entries.remove(key).map(|(_, e)| e);
        if let Some(entry) = &removed {
            self.bytes_used.fetch_sub(entry.size as u64, Ordering::Relaxed);
        }
        removed
    }

    fn evict_to_fit(&self) -> Vec<CacheEntry> {
        let mut evicted = Vec::new();

        while self.bytes_used.load(Ordering::Relaxed) as usize > self.capacity.capacity_bytes
            || self.entries.len() > self.capacity.capacity_entries
        {
            let Some(victim_key) = self.pick_victim() else {
                break;
            };
            if let Some(entry) = self.remove(&victim_key) {
                evicted.push(entry);
            } else {
                break;
            }
        }

        evicted
    }

    fn pick_victim(&self) -> Option<Key> {
        let now = Timestamp::now().as_nanos();
        let max_age = self
            .entries
            .iter()
            .map(|e| now.saturating_sub(e.last_access_ns))
            .max()
            .unwrap_or(1)
            .max(1);
        let max_size = self.entries.iter().map(|e| e.size as u64).max().unwrap_or(1).max(1);

        self.entries
            .iter()
            .map(|e| {
                let age_norm = now.saturating_sub(e.last_access_ns) as f32 / max_age as f32;
                let size_norm = e.size as f32 / max_size as f32;
                let score = composite_score(age_norm, size_norm, self.name, self.weights);
                (e.key().clone(), score, e.insert_seq)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal).then(a.2.cmp(&b.2)))
            .map(|(key, _, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        Key::try_from(s).unwrap()
    }

    fn value(s: &str) -> Value {
        Value::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn insert_then_get_roundtrips() {
        let tier = Tier::new(TierName::Hot, TierCapacity { capacity_bytes: 1024, capacity_entries: 10 });
        tier.insert(key("a"), value("1"));
        let (v, _) = tier.get(&key("a")).unwrap();
        assert_eq!(v.as_bytes(), b"1");
    }

    #[test]
    fn evicts_when_entry_count_exceeds_capacity() {
        let tier = Tier::new(TierName::Warm, TierCapacity { capacity_bytes: 1_000_000, capacity_entries: 2 });
        tier.insert(key("a"), value("1"));
        tier.insert(key("b"), value("2"));
        let evicted = tier.insert(key("c"), value("3"));
        assert_eq!(evicted.len(), 1);
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn evicts_when_bytes_exceed_capacity() {
        let tier = Tier::new(TierName::Cold, TierCapacity { capacity_bytes: 10, capacity_entries: 100 });
        tier.insert(key("a"), value("aaaaa"));
        let evicted = tier.insert(key("b"), value("bbbbb"));
        assert!(tier.bytes_used() <= 10);
        assert_eq!(evicted.len(), 1);
    }

    #[test]
    fn promotion_flag_set_on_threshold_crossing() {
        let tier = Tier::new(TierName::Warm, TierCapacity { capacity_bytes: 1024, capacity_entries: 10 });
        tier.insert(key("a"), value("1"));
        let mut promoted = false;
        for _ in 0..DEFAULT_PROMOTE_THRESHOLD {
            let (_, should_promote) = tier.get(&key("a")).unwrap();
            promoted |= should_promote;
        }
        assert!(promoted);
    }

    #[test]
    fn remove_frees_bytes() {
        let tier = Tier::new(TierName::Hot, TierCapacity { capacity_bytes: 1024, capacity_entries: 10 });
        tier.insert(key("a"), value("hello"));
        assert!(tier.bytes_used() > 0);
        tier.remove(&key("a"));
        assert_eq!(tier.bytes_used(), 0);
    }
}
