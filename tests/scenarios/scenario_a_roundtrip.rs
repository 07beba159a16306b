//! Scenario A: basic round-trip (`spec.md` §8).
//!
//! A value written through `put` is visible to `get` on the same engine,
//! across several shards and consistency levels.

use horizon::{Consistency, Engine, EngineConfig, GetOptions, PutOptions};
use tempfile::tempdir;

use super::test_utils::{key, value};

#[test]
fn put_then_get_returns_the_written_value() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(4).with_data_root(dir.path())).unwrap();

    engine.put(key("alpha"), value("1"), PutOptions::default()).unwrap();
    engine.put(key("beta"), value("2"), PutOptions::default()).unwrap();
    engine.put(key("gamma"), value("3"), PutOptions::default()).unwrap();

    assert_eq!(engine.get(&key("alpha"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"1");
    assert_eq!(engine.get(&key("beta"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"2");
    assert_eq!(engine.get(&key("gamma"), GetOptions::default()).unwrap().value.unwrap().as_bytes(), b"3");
}

#[test]
fn overwrite_replaces_the_prior_value() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(2).with_data_root(dir.path())).unwrap();

    engine.put(key("k"), value("first"), PutOptions::default()).unwrap();
    engine.put(key("k"), value("second"), PutOptions::default()).unwrap();

    let outcome = engine.get(&key("k"), GetOptions::default()).unwrap();
    assert_eq!(outcome.value.unwrap().as_bytes(), b"second");
}

#[test]
fn latest_consistency_bypasses_a_stale_cache_entry() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(1).with_data_root(dir.path())).unwrap();

    engine.put(key("k"), value("v1"), PutOptions::default()).unwrap();
    // Warm the cache, then write again with `skip_cache` so the cache goes stale.
    engine.get(&key("k"), GetOptions { consistency: Consistency::CachedOk, ..GetOptions::default() }).unwrap();
    engine.put(key("k"), value("v2"), PutOptions { skip_cache: true, ..PutOptions::default() }).unwrap();

    let latest = engine.get(&key("k"), GetOptions { consistency: Consistency::Latest, ..GetOptions::default() }).unwrap();
    assert_eq!(latest.value.unwrap().as_bytes(), b"v2");
}

#[test]
fn delete_then_get_reports_a_miss() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(3).with_data_root(dir.path())).unwrap();

    engine.put(key("k"), value("v"), PutOptions::default()).unwrap();
    assert!(engine.delete(&key("k")).unwrap().deleted);
    assert!(engine.get(&key("k"), GetOptions::default()).unwrap().value.is_none());
    assert!(!engine.delete(&key("k")).unwrap().deleted);
}
