//! Horizon is a sharded, in-memory key-value engine with per-shard
//! write-ahead logging, a tiered cache, adaptive routing, and a
//! rule-driven prefetcher.
//!
//! # Components
//!
//! - **Sharded storage**: the keyspace is split across a fixed number of
//!   shards, each with its own in-memory table and its own
//!   write-ahead log. A [`Router`] decides which shard a key belongs to,
//!   under a hash, locality, load-balanced, or gravitational policy.
//! - **Event Horizon cache**: a four-tier cache (Hot/Warm/Cold/Universal)
//!   sitting in front of the shards, with cascading demotion on eviction
//!   and promotion on repeated access.
//! - **Quantum entanglement**: configured associations between a key and
//!   its related keys, resolved and opportunistically prefetched on a
//!   dedicated worker pool whenever a caller asks for a key via
//!   [`Engine::quantum_get`].
//! - **Entropy / load monitor**: periodically samples per-shard activity,
//!   computes a Shannon-entropy imbalance score, and recommends bounded
//!   key migrations to rebalance a skewed workload.
//!
//! # Quick start
//!
//! ```no_run
//! use horizon::{Engine, EngineConfig, Key, PutOptions, GetOptions, Value};
//!
//! let config = EngineConfig::new()
//!     .with_num_shards(8)
//!     .with_data_root("./horizon-data");
//!
//! let engine = Engine::open(config).unwrap();
//! let key = Key::try_from("user:42").unwrap();
//! let value = Value::new(b"hello".to_vec()).unwrap();
//!
//! engine.put(key.clone(), value, PutOptions::default()).unwrap();
//! let outcome = engine.get(&key, GetOptions::default()).unwrap();
//! assert_eq!(outcome.value.unwrap().as_bytes(), b"hello");
//! ```

#![warn(missing_docs)]

pub use horizon_cache::{
    CacheEntry, EventHorizon, HorizonCapacities, HorizonSnapshot, LookupSource, Tier, TierCapacity, TierName,
};
pub use horizon_core::{
    AccessPattern, Consistency, GetOptions, HorizonError, Key, Limits, Priority, PutOptions, Record, Result,
    TierHint, Timestamp, Value,
};
pub use horizon_engine::{
    DeleteOutcome, Engine, EngineConfig, GetOutcome, Manifest, MetricsSnapshot, PrefetchConfig, PutOutcome,
    QuantumGetOutcome, Source,
};
pub use horizon_entanglement::{EntanglementRule, RelatedKey, Registry};
pub use horizon_entropy::{EntropyConfig, EntropyMonitor, EntropyReport};
pub use horizon_storage::{MigrationTask, RoutingPolicy, Router, Shard};
pub use horizon_wal::DurabilityMode;
