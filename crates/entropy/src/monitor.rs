//! Periodic load sampling and migration recommendation
//! (`spec.md` §4.7 "Entropy / Load Monitor").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use horizon_core::Timestamp;
use horizon_storage::{MigrationTask, Shard};

use crate::sampler::{compute_report, EntropyConfig, EntropyReport, LoadSnapshot, ShardLoad};

/// Samples shard counters on a schedule, computes an [`EntropyReport`],
/// and (subject to the rebalance cooldown) proposes a bounded batch of
/// [`MigrationTask`]s moving keys off the hottest shard onto the
/// coldest one.
///
/// Holds the previous cumulative counter reading per shard so each
/// sample reflects activity *since the last sample*
/// (`spec.md` §3 `ShardCounters` "may be reset by sampler snapshots") —
/// implemented here as a delta against the monitor's own running state
/// rather than mutating the shard's counters, since those remain useful
/// as lifetime totals for `metrics()`.
pub struct EntropyMonitor {
    config: EntropyConfig,
    previous: Mutex<Option<Vec<ShardLoad>>>,
    last_rebalance_at: AtomicU64,
}

impl EntropyMonitor {
    /// Construct a monitor with the given sampling configuration.
    pub fn new(config: EntropyConfig) -> Self {
        EntropyMonitor {
            config,
            previous: Mutex::new(None),
            last_rebalance_at: AtomicU64::new(0),
        }
    }

    /// Sampling configuration this monitor was constructed with.
    pub fn config(&self) -> &EntropyConfig {
        &self.config
    }

    /// Take one sample across every shard, returning both the raw
    /// snapshot and the computed entropy report. `recommend_rebalance`
    /// on the returned report additionally accounts for the rebalance
    /// cooldown, unlike [`compute_report`]'s raw threshold check.
    pub fn sample(&self, shards: &[Arc<Shard>]) -> (LoadSnapshot, EntropyReport) {
        let now = Timestamp::now();
        let current: Vec<ShardLoad> = shards
            .iter()
            .map(|s| ShardLoad {
                reads: s.counters().reads(),
                writes: s.counters().writes(),
                bytes: s.counters().bytes_resident(),
            })
            .collect();

        let mut previous = self.previous.lock().unwrap();
        let deltas: Vec<ShardLoad> = match previous.as_ref() {
            Some(prev) => current
                .iter()
                .zip(prev.iter())
                .map(|(cur, prev)| ShardLoad {
                    reads: cur.reads.saturating_sub(prev.reads),
                    writes: cur.writes.saturating_sub(prev.writes),
                    bytes: cur.bytes,
                })
                .collect(),
            None => current.clone(),
        };
        *previous = Some(current);
        drop(previous);

        let total = deltas.iter().fold(ShardLoad::default(), |acc, d| ShardLoad {
            reads: acc.reads + d.reads,
            writes: acc.writes + d.writes,
            bytes: acc.bytes + d.bytes,
        });

        let activity: Vec<f64> = deltas.iter().map(|d| self.config.weights.activity(d)).collect();
        let mut report = compute_report(&activity, self.config.imbalance_threshold);

        if report.recommend_rebalance {
            let elapsed_ms = now
                .duration_since(Timestamp::from_nanos(self.last_rebalance_at.load(Ordering::Acquire)))
                .map(|d| d.as_millis() as u64)
                .unwrap_or(u64::MAX);
            if elapsed_ms < self.config.rebalance_cooldown_ms {
                report.recommend_rebalance = false;
            }
        }

        let snapshot = LoadSnapshot {
            per_shard: deltas,
            total,
            timestamp_ns: now.as_nanos(),
        };

        if report.recommend_rebalance {
            tracing::info!(
                imbalance = report.imbalance_score,
                hot = ?report.hot_shards,
                cold = ?report.cold_shards,
                "entropy monitor recommends rebalance"
            );
        }

        (snapshot, report)
    }

    /// Record that a rebalance pass has just run, resetting the cooldown
    /// window. Called by whoever executes the migrations this monitor
    /// recommended.
    pub fn mark_rebalanced(&self) {
        self.last_rebalance_at.store(Timestamp::now().as_nanos(), Ordering::Release);
    }

    /// Propose migration tasks moving keys from the hottest shard to the
    /// coldest, bounded by `max_migrations_per_window`. Returns an empty
    /// vector if the report doesn't recommend a rebalance, or if there is
    /// no hot/cold pair to act on.
    pub fn recommend_migrations(&self, shards: &[Arc<Shard>], report: &EntropyReport) -> Vec<MigrationTask> {
        if !report.recommend_rebalance {
            return Vec::new();
        }
        let (Some(&hot), Some(&cold)) = (report.hot_shards.first(), report.cold_shards.first()) else {
            return Vec::new();
        };
        if hot == cold {
            return Vec::new();
        }
        let Some(source) = shards.get(hot as usize) else {
            return Vec::new();
        };

        source
            .snapshot_keys()
            .into_iter()
            .take(self.config.max_migrations_per_window)
            .map(|key| MigrationTask { key, source_shard: hot, target_shard: cold })
            .collect()
    }
}
