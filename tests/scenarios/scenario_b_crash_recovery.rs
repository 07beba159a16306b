//! Scenario B: crash mid-append recovery (`spec.md` §8).
//!
//! Writes committed before a simulated crash (dropping the `Engine`
//! without calling `close`) must still be visible after reopening against
//! the same data directory; a torn trailing WAL frame must not poison
//! recovery of the well-formed frames before it.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use horizon::{DurabilityMode, Engine, EngineConfig, GetOptions, PutOptions};
use tempfile::tempdir;

use super::test_utils::{key, value};

#[test]
fn writes_before_an_unclean_shutdown_survive_reopen() {
    let dir = tempdir().unwrap();
    let config = || EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync);

    {
        let engine = Engine::open(config()).unwrap();
        engine.put(key("a"), value("1"), PutOptions::default()).unwrap();
        engine.put(key("b"), value("2"), PutOptions::default()).unwrap();
        // Dropped without `close()`: simulates a crash after fsync'd writes
        // but before a clean shutdown sequence ran.
    }

    let engine = Engine::open(config()).unwrap();
    assert_eq!(engine.get(&key("a"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"1");
    assert_eq!(engine.get(&key("b"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"2");
}

#[test]
fn a_torn_trailing_frame_is_truncated_without_losing_earlier_writes() {
    let dir = tempdir().unwrap();
    let config = || EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync);

    let wal_path = {
        let engine = Engine::open(config()).unwrap();
        engine.put(key("committed"), value("ok"), PutOptions::default()).unwrap();
        engine.put(key("also-committed"), value("ok2"), PutOptions::default()).unwrap();
        engine.close().unwrap();

        let shard_dir = dir.path().join("shard_00");
        std::fs::read_dir(&shard_dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .find(|p| p.extension().map(|ext| ext == "wal").unwrap_or(false))
            .expect("expected a wal segment file")
    };

    // Append a handful of garbage bytes after the last well-formed frame,
    // simulating a process killed mid-write of its final frame.
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.seek(SeekFrom::End(0)).unwrap();
    file.write_all(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02]).unwrap();
    file.flush().unwrap();

    let engine = Engine::open(config()).unwrap();
    assert_eq!(engine.get(&key("committed"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"ok");
    assert_eq!(engine.get(&key("also-committed"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"ok2");
}

#[test]
fn deletes_before_a_crash_are_observed_after_recovery() {
    let dir = tempdir().unwrap();
    let config = || EngineConfig::new().with_num_shards(1).with_data_root(dir.path()).with_durability(DurabilityMode::Sync);

    {
        let engine = Engine::open(config()).unwrap();
        engine.put(key("k"), value("v"), PutOptions::default()).unwrap();
        engine.delete(&key("k")).unwrap();
    }

    let engine = Engine::open(config()).unwrap();
    assert!(engine.get(&key("k"), GetOptions::default()).unwrap().value.is_none());
}

#[test]
fn a_key_pinned_to_a_non_natural_shard_is_still_found_after_reopen() {
    // Regression: a key forced onto a shard other than its hash-routed
    // one must remain reachable after a restart, not just resident on
    // disk. The override that placed it there lives only in the
    // router's in-memory table, so recovery must rebuild it from where
    // the key actually sits.
    let dir = tempdir().unwrap();
    let config = || EngineConfig::new().with_num_shards(4).with_data_root(dir.path()).with_durability(DurabilityMode::Sync);

    {
        let engine = Engine::open(config()).unwrap();
        let natural = engine.put(key("pinned"), value("v1"), PutOptions::default()).unwrap().shard_id;
        let forced = (natural + 1) % 4;
        let outcome = engine
            .put(key("pinned"), value("v2"), PutOptions { override_shard: Some(forced), ..PutOptions::default() })
            .unwrap();
        assert_eq!(outcome.shard_id, forced);
        engine.close().unwrap();
    }

    let engine = Engine::open(config()).unwrap();
    let outcome = engine.get(&key("pinned"), GetOptions::default()).unwrap();
    assert_eq!(outcome.value.unwrap().as_bytes(), b"v2");
}
