//! The horizon engine facade: configuration, recovery, lifecycle, and
//! the background workers that tie every other `horizon-*` crate
//! together into one running key-value engine (`spec.md` §4 "Engine
//! Facade").
//!
//! [`config`] is the programmatic builder applications construct an
//! engine from. [`manifest`] and [`recovery`] handle startup: validating
//! (or creating) `data_root`, then replaying every shard's WAL in
//! parallel. [`background`] provides the priority scheduler driving WAL
//! flush ticks and recommended migrations, plus the [`background::ShutdownSignal`]
//! the periodic tickers in [`engine`] sleep against. [`metrics`] is the
//! point-in-time snapshot `Engine::metrics()` returns.

#![warn(missing_docs)]

pub mod background;
pub mod config;
pub mod engine;
pub mod manifest;
pub mod metrics;
pub mod recovery;

pub use background::{BackgroundScheduler, BackpressureError, SchedulerStats, ShutdownSignal, TaskPriority};
pub use config::{EngineConfig, PrefetchConfig, MAX_SHARDS};
pub use engine::{DeleteOutcome, Engine, GetOutcome, PutOutcome, QuantumGetOutcome, Source};
pub use manifest::{Manifest, FORMAT_VERSION};
pub use metrics::{CacheMetrics, MetricsSnapshot, ShardMetrics, ShardWalMetrics, WalMetrics};
