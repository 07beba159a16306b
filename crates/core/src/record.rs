//! The unit of storage owned by a shard.

use crate::key::Key;
use crate::timestamp::Timestamp;
use crate::value::Value;

/// Placement hint for a record, used by the cache tiers and the router's
/// gravitational policy. `spec.md` §3 calls this `tier_hint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierHint {
    /// Frequently accessed; prefer the hot cache tier.
    Hot,
    /// Moderately accessed; prefer the warm cache tier.
    Warm,
    /// Rarely accessed; prefer the cold cache tier.
    Cold,
}

impl Default for TierHint {
    fn default() -> Self {
        TierHint::Warm
    }
}

/// A single key-value record as stored by a shard.
///
/// Invariants (`spec.md` §3):
/// - `version` strictly increases on updates to the same key within a
///   shard.
/// - `shard_id` is stable unless the record is migrated.
/// - `updated_at >= created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The record's key.
    pub key: Key,
    /// The record's value.
    pub value: Value,
    /// Monotonically increasing per-key version, assigned by the owning
    /// shard.
    pub version: u64,
    /// Time the record was first created.
    pub created_at: Timestamp,
    /// Time the record was last updated (equal to `created_at` on first
    /// write).
    pub updated_at: Timestamp,
    /// The shard that owns this record.
    pub shard_id: u16,
    /// Cache placement hint.
    pub tier_hint: TierHint,
}

impl Record {
    /// Construct the first version of a record (`created_at == updated_at`).
    pub fn new(key: Key, value: Value, version: u64, shard_id: u16, tier_hint: TierHint) -> Self {
        let now = Timestamp::now();
        Record {
            key,
            value,
            version,
            created_at: now,
            updated_at: now,
            shard_id,
            tier_hint,
        }
    }

    /// Produce the next version of this record with a new value, preserving
    /// `created_at` and the shard assignment.
    pub fn with_next_version(&self, value: Value, version: u64, tier_hint: TierHint) -> Self {
        debug_assert!(
            version > self.version,
            "record version must strictly increase"
        );
        Record {
            key: self.key.clone(),
            value,
            version,
            created_at: self.created_at,
            updated_at: Timestamp::now(),
            shard_id: self.shard_id,
            tier_hint,
        }
    }

    /// Approximate heap size of this record, used by cache tiers to track
    /// capacity in bytes.
    pub fn size_bytes(&self) -> usize {
        self.key.len() + self.value.len()
    }
}
