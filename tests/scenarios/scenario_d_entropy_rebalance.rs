//! Scenario D: entropy-driven adaptive routing (`spec.md` §8).
//!
//! Exercised directly against `Shard` and `EntropyMonitor` rather than
//! through `Engine`'s background ticker, so the assertions don't race a
//! real-time sampling interval.

use std::sync::Arc;

use horizon::{DurabilityMode, EntropyConfig, EntropyMonitor, Limits, Shard, TierHint, Value};
use tempfile::tempdir;

use super::test_utils::key;

fn open_shard(dir: &std::path::Path, id: u16) -> Arc<Shard> {
    Arc::new(Shard::open(id, dir.join(format!("shard_{id:02}")), Limits::default(), DurabilityMode::Sync).unwrap())
}

#[test]
fn a_skewed_workload_is_reported_as_imbalanced_and_names_the_hot_shard() {
    let dir = tempdir().unwrap();
    let shards = vec![open_shard(dir.path(), 0), open_shard(dir.path(), 1), open_shard(dir.path(), 2), open_shard(dir.path(), 3)];

    for i in 0..200 {
        shards[0].put(key(&format!("k{i}")), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();
    }
    shards[2].put(key("single"), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();

    let config = EntropyConfig { imbalance_threshold: 0.2, ..EntropyConfig::default() };
    let monitor = EntropyMonitor::new(config);

    let (_snapshot, report) = monitor.sample(&shards);
    assert!(report.imbalance_score > 0.2, "expected a high imbalance score, got {}", report.imbalance_score);
    assert!(report.hot_shards.contains(&0), "shard 0 absorbed nearly all writes and should be flagged hot");
    assert!(report.recommend_rebalance);
}

#[test]
fn an_evenly_spread_workload_is_reported_as_balanced() {
    let dir = tempdir().unwrap();
    let shards = vec![open_shard(dir.path(), 0), open_shard(dir.path(), 1), open_shard(dir.path(), 2), open_shard(dir.path(), 3)];

    for shard in &shards {
        for i in 0..50 {
            shard.put(key(&format!("k{i}")), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();
        }
    }

    let monitor = EntropyMonitor::new(EntropyConfig::default());
    let (_snapshot, report) = monitor.sample(&shards);
    assert!(!report.recommend_rebalance);
    assert!(report.imbalance_score < EntropyConfig::default().imbalance_threshold);
}

#[test]
fn recommended_migrations_target_the_coldest_shard() {
    let dir = tempdir().unwrap();
    let shards = vec![open_shard(dir.path(), 0), open_shard(dir.path(), 1)];

    for i in 0..100 {
        shards[0].put(key(&format!("hot{i}")), Value::new(b"v".to_vec()).unwrap(), TierHint::Warm).unwrap();
    }

    let config = EntropyConfig { imbalance_threshold: 0.1, rebalance_cooldown_ms: 0, ..EntropyConfig::default() };
    let monitor = EntropyMonitor::new(config);
    let (_snapshot, report) = monitor.sample(&shards);
    assert!(report.recommend_rebalance);

    let tasks = monitor.recommend_migrations(&shards, &report);
    assert!(!tasks.is_empty());
    assert!(tasks.iter().all(|t| t.source_shard == 0 && t.target_shard == 1));
}
