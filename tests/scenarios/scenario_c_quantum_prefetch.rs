//! Scenario C: quantum prefetch (`spec.md` §8).
//!
//! `quantum_get` resolves the primary key and opportunistically prefetches
//! its entangled related keys, respecting `max_fanout` and reporting a
//! `source` for every key it touched.

use std::collections::HashSet;

use horizon::{Engine, EngineConfig, EntanglementRule, PutOptions, Source};
use tempfile::tempdir;

use super::test_utils::{key, value};

#[test]
fn related_keys_are_prefetched_alongside_the_primary() {
    let dir = tempdir().unwrap();
    let rules = vec![EntanglementRule::new("order:*", vec!["customer:*".into(), "invoice:*".into()], 8, 0.8).unwrap()];
    let engine = Engine::open(EngineConfig::new().with_num_shards(4).with_data_root(dir.path()).with_entanglement_rules(rules)).unwrap();

    engine.put(key("order:7"), value("pending"), PutOptions::default()).unwrap();
    engine.put(key("customer:7"), value("jane"), PutOptions::default()).unwrap();
    engine.put(key("invoice:7"), value("inv-7"), PutOptions::default()).unwrap();

    let outcome = engine.quantum_get(&key("order:7")).unwrap();
    assert_eq!(outcome.primary.as_ref().unwrap().as_bytes(), b"pending");
    assert_eq!(outcome.related.get(&key("customer:7")).unwrap().as_bytes(), b"jane");
    assert_eq!(outcome.related.get(&key("invoice:7")).unwrap().as_bytes(), b"inv-7");
    assert!(outcome.sources.contains_key(&key("order:7")));
}

#[test]
fn a_miss_on_the_primary_still_reports_a_miss_source() {
    let dir = tempdir().unwrap();
    let engine = Engine::open(EngineConfig::new().with_num_shards(2).with_data_root(dir.path())).unwrap();

    let outcome = engine.quantum_get(&key("nope")).unwrap();
    assert!(outcome.primary.is_none());
    assert!(outcome.related.is_empty());
}

#[test]
fn a_related_key_resolved_from_the_shard_is_reported_as_shard_not_cache() {
    // Regression: a related key that has never passed through the cache
    // must be reported as `Source::Shard`, not unconditionally `Cache`,
    // since the prefetch path falls through to the shard on a miss.
    let dir = tempdir().unwrap();
    let rules = vec![EntanglementRule::new("order:*", vec!["customer:*".into()], 8, 0.8).unwrap()];
    let engine = Engine::open(EngineConfig::new().with_num_shards(4).with_data_root(dir.path()).with_entanglement_rules(rules)).unwrap();

    engine.put(key("order:9"), value("pending"), PutOptions::default()).unwrap();
    engine.put(key("customer:9"), value("jane"), PutOptions::default()).unwrap();

    let outcome = engine.quantum_get(&key("order:9")).unwrap();
    assert_eq!(outcome.related.get(&key("customer:9")).unwrap().as_bytes(), b"jane");
    assert_eq!(outcome.sources.get(&key("customer:9")), Some(&Source::Shard));
}

#[test]
fn fanout_is_bounded_by_the_configured_max_fanout() {
    let dir = tempdir().unwrap();
    let related: Vec<String> = (0..20).map(|i| format!("leaf:{i}")).collect();
    let rules = vec![EntanglementRule::new("root:*", related, 3, 0.5).unwrap()];
    let mut prefetch = horizon::PrefetchConfig::default();
    prefetch.max_fanout = 3;
    let engine = Engine::open(
        EngineConfig::new().with_num_shards(2).with_data_root(dir.path()).with_entanglement_rules(rules).with_prefetch_config(prefetch),
    )
    .unwrap();

    engine.put(key("root:1"), value("r"), PutOptions::default()).unwrap();
    for i in 0..20 {
        engine.put(key(&format!("leaf:{i}")), value("l"), PutOptions::default()).unwrap();
    }

    let outcome = engine.quantum_get(&key("root:1")).unwrap();
    assert!(outcome.related.len() <= 3, "expected at most 3 prefetched keys, got {}", outcome.related.len());
    let returned_leaves: HashSet<_> = outcome.related.keys().cloned().collect();
    assert!(returned_leaves.len() <= 3);
}
