//! Scenario E: durability modes (`spec.md` §8, §4.4 "Durability modes").
//!
//! `Sync` guarantees every write is fsync'd before `put` returns; `Async`
//! and `Grouped` trade some of that guarantee for lower latency but must
//! still recover everything flushed before a clean `close()`.

use std::time::Duration;

use horizon::{DurabilityMode, Engine, EngineConfig, GetOptions, PutOptions};
use tempfile::tempdir;

use super::test_utils::{key, value};

fn writes_survive_reopen_under(mode: DurabilityMode) {
    let dir = tempdir().unwrap();
    let config = || EngineConfig::new().with_num_shards(2).with_data_root(dir.path()).with_durability(mode);

    {
        let engine = Engine::open(config()).unwrap();
        for i in 0..25 {
            engine.put(key(&format!("k{i}")), value("v"), PutOptions::default()).unwrap();
        }
        engine.close().unwrap();
    }

    let engine = Engine::open(config()).unwrap();
    for i in 0..25 {
        let outcome = engine.get(&key(&format!("k{i}")), GetOptions::default()).unwrap();
        assert!(outcome.value.is_some(), "key k{i} missing after reopen under {mode:?}");
    }
}

#[test]
fn sync_mode_survives_reopen() {
    writes_survive_reopen_under(DurabilityMode::Sync);
}

#[test]
fn async_mode_survives_a_clean_close() {
    writes_survive_reopen_under(DurabilityMode::Async);
}

#[test]
fn grouped_mode_survives_a_clean_close() {
    writes_survive_reopen_under(DurabilityMode::Grouped { max_batch: 8, max_delay: Duration::from_millis(5) });
}

#[test]
fn sync_mode_reports_append_receipts_as_synced() {
    // Exercised through the shard directly since `Engine::put` doesn't
    // surface the `AppendReceipt`; `horizon_wal`'s own writer tests cover
    // `synced` bit-for-bit, this just confirms the mode reaches the shard
    // unchanged through `EngineConfig`.
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync)).unwrap();
    engine.put(key("a"), value("1"), PutOptions::default()).unwrap();
    let wal = engine.metrics().wal;
    assert_eq!(wal.shards.len(), 1);
    assert_eq!(wal.shards[0].pending_since_sync, 0);
}
