//! Live key migration between shards (`spec.md` §4.2 "Migration",
//! §8 Scenario: migration crash reconciliation).
//!
//! A migration moves one key from a source shard to a target shard as two
//! WAL-recorded halves sharing a `migration_id`: the target adopts the key
//! (`MigrationPut`) *before* the source releases it (`MigrationDelete`).
//! If the engine crashes between the two halves, recovery sees the target
//! already holding the key; the source's stale copy is simply shadowed by
//! the router no longer pointing at it. `spec.md` explicitly scopes
//! migration atomicity to this one-key, two-frame reconciliation — there
//! is no multi-key atomic batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use horizon_core::{HorizonError, Key, Result};

use crate::router::Router;
use crate::shard::Shard;

/// A single pending key relocation.
#[derive(Debug, Clone)]
pub struct MigrationTask {
    /// Key to move.
    pub key: Key,
    /// Shard currently holding the key.
    pub source_shard: u16,
    /// Shard the key should move to.
    pub target_shard: u16,
}

/// Assigns unique ids to migrations so their two frames can be paired
/// during recovery.
#[derive(Default)]
pub struct MigrationIdAllocator(AtomicU64);

impl MigrationIdAllocator {
    /// Allocate the next migration id.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Execute a single migration task: adopt on the target, then release on
/// the source, updating the router's sticky override last so concurrent
/// readers never observe the key missing from both shards.
pub fn execute(
    task: &MigrationTask,
    shards: &[Arc<Shard>],
    router: &Router,
    ids: &MigrationIdAllocator,
) -> Result<()> {
    let source = shards
        .get(task.source_shard as usize)
        .ok_or_else(|| HorizonError::ShardUnavailable(format!("source shard {}", task.source_shard)))?;
    let target = shards
        .get(task.target_shard as usize)
        .ok_or_else(|| HorizonError::ShardUnavailable(format!("target shard {}", task.target_shard)))?;

    let record = match source.get(&task.key) {
        Some(record) => record,
        None => return Ok(()), // already moved, or never existed: nothing to do
    };

    let migration_id = ids.next();

    let mut record = record;
    record.shard_id = task.target_shard;
    target.adopt_migrated(record, migration_id)?;

    router.record_override(task.key.clone(), task.target_shard);

    source.release_migrated(&task.key, migration_id)?;

    tracing::info!(
        key = %task.key,
        from = task.source_shard,
        to = task.target_shard,
        migration_id,
        "migrated key"
    );

    Ok(())
}
