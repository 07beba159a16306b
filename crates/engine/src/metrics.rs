//! The `metrics()` surface (`spec.md` §6 "Metrics surface").
//!
//! Counter/gauge names in doc comments follow `spec.md`'s
//! `engine.puts_total` style so a future exporter has an obvious mapping;
//! no metrics backend (Prometheus/StatsD) is wired up here, since that is
//! a web/HTTP concern explicitly out of scope.

use horizon_cache::HorizonSnapshot;
use horizon_entropy::EntropyReport;
use horizon_storage::Shard;

/// One shard's point-in-time counters. `engine.shard.<id>.{reads,writes,
/// deletes}_total`, `engine.shard.<id>.bytes_resident`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardMetrics {
    /// This shard's id.
    pub shard_id: u16,
    /// Keys currently resident.
    pub key_count: usize,
    /// Lifetime reads.
    pub reads_total: u64,
    /// Lifetime writes.
    pub writes_total: u64,
    /// Lifetime deletes.
    pub deletes_total: u64,
    /// Resident key+value bytes.
    pub bytes_resident: u64,
    /// Current routing mass.
    pub mass: f32,
}

/// Per-tier cache occupancy. Mirrors [`HorizonSnapshot`] under the name
/// `engine.cache.<tier>.bytes` / `engine.cache.<tier>.entries`.
pub type CacheMetrics = HorizonSnapshot;

/// Per-shard WAL write-buffer state. `engine.wal.<id>.pending_since_sync`,
/// `engine.wal.<id>.active_segment_base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardWalMetrics {
    /// This shard's id.
    pub shard_id: u16,
    /// Appends since the last fsync.
    pub pending_since_sync: usize,
}

/// WAL-wide metrics: one entry per shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalMetrics {
    /// Per-shard pending-append counts.
    pub shards: Vec<ShardWalMetrics>,
}

/// The full point-in-time snapshot returned by `Engine::metrics()`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Per-shard counters.
    pub shards: Vec<ShardMetrics>,
    /// Cache tier occupancy.
    pub cache: CacheMetrics,
    /// WAL write-buffer state.
    pub wal: WalMetrics,
    /// Most recent entropy/imbalance report.
    pub entropy: EntropyReport,
}

pub(crate) fn shard_metrics(shard: &Shard) -> ShardMetrics {
    ShardMetrics {
        shard_id: shard.id(),
        key_count: shard.len(),
        reads_total: shard.counters().reads(),
        writes_total: shard.counters().writes(),
        deletes_total: shard.counters().deletes(),
        bytes_resident: shard.counters().bytes_resident(),
        mass: shard.mass().get(),
    }
}

pub(crate) fn shard_wal_metrics(shard: &Shard) -> ShardWalMetrics {
    ShardWalMetrics { shard_id: shard.id(), pending_since_sync: shard.wal_pending_since_sync() }
}
