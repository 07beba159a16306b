//! The Event Horizon tiered cache.
//!
//! [`tier`] implements one bounded, self-evicting tier. [`eviction`]
//! computes the composite score used to pick victims. [`horizon`] wires
//! four tiers (Hot/Warm/Cold/Universal) together with cascading
//! demotion, promotion, and invalidation.

#![warn(missing_docs)]

pub mod entry;
pub mod eviction;
pub mod horizon;
pub mod tier;

pub use entry::CacheEntry;
pub use eviction::{composite_score, tier_priority, EvictionWeights};
pub use horizon::{EventHorizon, HorizonCapacities, HorizonSnapshot, LookupSource};
pub use tier::{Tier, TierCapacity, TierName, DEFAULT_PROMOTE_THRESHOLD};
