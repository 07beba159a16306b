//! Scenario F: WAL rotation boundary (`spec.md` §8, §6 "Rotation
//! thresholds").
//!
//! A shard whose segment hits `max_segment_bytes` rotates onto a new
//! segment file without losing any previously-written key, and recovery
//! after reopening walks every segment in order.

use horizon::{DurabilityMode, Engine, EngineConfig, GetOptions, Limits, PutOptions};
use tempfile::tempdir;

use super::test_utils::{key, value};

#[test]
fn a_tiny_segment_limit_forces_multiple_rotations_without_losing_data() {
    let dir = tempdir().unwrap();
    let limits = Limits::default().with_max_segment_bytes(256);
    let config = EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync).with_limits(limits);
    let engine = Engine::open(config).unwrap();

    for i in 0..100 {
        engine.put(key(&format!("rotating-key-{i:03}")), value("payload-value"), PutOptions::default()).unwrap();
    }

    let shard_dir = dir.path().join("shard_00");
    let segment_count = std::fs::read_dir(&shard_dir).unwrap().filter(|e| e.as_ref().unwrap().path().extension().map(|ext| ext == "wal").unwrap_or(false)).count();
    assert!(segment_count > 1, "expected rotation to produce multiple segments, got {segment_count}");

    for i in 0..100 {
        let outcome = engine.get(&key(&format!("rotating-key-{i:03}")), GetOptions::default()).unwrap();
        assert_eq!(outcome.value.unwrap().as_bytes(), b"payload-value");
    }
}

#[test]
fn recovery_after_rotation_replays_every_segment_in_order() {
    let dir = tempdir().unwrap();
    let limits = Limits::default().with_max_segment_bytes(256);
    let config = || {
        EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync).with_limits(limits)
    };

    {
        let engine = Engine::open(config()).unwrap();
        for i in 0..100 {
            engine.put(key(&format!("k{i:03}")), value(&format!("v{i}")), PutOptions::default()).unwrap();
        }
        engine.close().unwrap();
    }

    let engine = Engine::open(config()).unwrap();
    for i in 0..100 {
        let outcome = engine.get(&key(&format!("k{i:03}")), GetOptions::default()).unwrap();
        assert_eq!(outcome.value.unwrap().as_bytes(), format!("v{i}").as_bytes());
    }
}
