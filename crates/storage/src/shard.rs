//! A single shard: its key table and its write-ahead log
//! (`spec.md` §3 `Shard`, §4.1 single-key operations).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;

use horizon_core::{HorizonError, Key, Limits, Record, Result, TierHint, Timestamp, Value};
use horizon_wal::{recover_shard, AppendReceipt, DurabilityMode, WalFrame, WalWriter};

/// Live counters a shard exposes for load monitoring and metrics
/// (`spec.md` §4.3 "activity score").
#[derive(Debug, Default)]
pub struct ShardCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    bytes_resident: AtomicU64,
}

impl ShardCounters {
    /// Total reads observed since the shard was opened.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Total writes (puts) observed since the shard was opened.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Total deletes observed since the shard was opened.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Approximate resident key+value bytes currently held.
    pub fn bytes_resident(&self) -> u64 {
        self.bytes_resident.load(Ordering::Relaxed)
    }
}

/// A shard's routing "mass": a scalar load figure the router and the
/// entropy monitor use to steer new placements and recommend migrations
/// (`spec.md` §4.2 "gravitational" policy, §4.3).
///
/// Stored as bit-cast `f32` in an `AtomicU32` so reads never block a
/// writer recomputing it.
#[derive(Debug, Default)]
pub struct Mass(AtomicU32);

impl Mass {
    /// Read the current mass value.
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Overwrite the mass value, typically from the entropy sampler.
    pub fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// One shard of the keyspace: an in-memory table backed by its own WAL.
pub struct Shard {
    id: u16,
    table: DashMap<Key, Record>,
    wal: Mutex<WalWriter>,
    counters: ShardCounters,
    mass: Mass,
    next_version: AtomicU64,
}

impl Shard {
    /// Open a shard's WAL and replay it into an empty in-memory table.
    /// This is the per-shard half of engine startup recovery
    /// (`spec.md` §4.4 "Recovery").
    pub fn open(id: u16, shard_dir: PathBuf, limits: Limits, mode: DurabilityMode) -> Result<Self> {
        let table: DashMap<Key, Record> = DashMap::new();
        let counters = ShardCounters::default();
        let mut max_version = 0u64;

        let outcome = recover_shard(&shard_dir, |frame| {
            apply_recovered_frame(&table, &counters, &mut max_version, id, frame);
        })?;

        let mut writer = WalWriter::open(shard_dir, limits, mode)?;
        writer.set_next_seq(outcome.next_seq);

        tracing::info!(
            shard = id,
            frames_applied = outcome.frames_applied,
            truncated_bytes = outcome.truncated_bytes,
            keys = table.len(),
            "shard recovered"
        );

        Ok(Shard {
            id,
            table,
            wal: Mutex::new(writer),
            counters,
            mass: Mass::default(),
            next_version: AtomicU64::new(max_version + 1),
        })
    }

    /// This shard's id.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Number of keys currently resident.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if the shard holds no keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Read-only access to this shard's live counters.
    pub fn counters(&self) -> &ShardCounters {
        &self.counters
    }

    /// Read-only access to this shard's routing mass.
    pub fn mass(&self) -> &Mass {
        &self.mass
    }

    /// Write `key` -> `value`, WAL-first, returning the stored record.
    pub fn put(&self, key: Key, value: Value, tier_hint: TierHint) -> Result<Record> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        let frame = WalFrame::put(0, Timestamp::now().as_nanos(), key.as_bytes().to_vec(), value.as_bytes().to_vec());
        self.append_frame(frame)?;

        let record = match self.table.get(&key) {
            Some(existing) => existing.with_next_version(value, version, tier_hint),
            None => Record::new(key.clone(), value, version, self.id, tier_hint),
        };

        let size_delta = record.size_bytes() as u64;
        let old_size = self.table.insert(key, record.clone()).map(|old| old.size_bytes() as u64);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        match old_size {
            Some(old) => {
                let bytes = &self.counters.bytes_resident;
                bytes.fetch_sub(old.min(bytes.load(Ordering::Relaxed)), Ordering::Relaxed);
                bytes.fetch_add(size_delta, Ordering::Relaxed);
            }
            None => {
                self.counters.bytes_resident.fetch_add(size_delta, Ordering::Relaxed);
            }
        }

        Ok(record)
    }

    /// Read `key`, if present.
    pub fn get(&self, key: &Key) -> Option<Record> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        self.table.get(key).map(|r| r.clone())
    }

    /// Delete `key`, WAL-first, returning the removed record if any.
    pub fn delete(&self, key: &Key) -> Result<Option<Record>> {
        let frame = WalFrame::delete(0, Timestamp::now().as_nanos(), key.as_bytes().to_vec());
        self.append_frame(frame)?;

        let removed = self.table.remove(key).map(|(_, record)| record);
        if let Some(record) = &removed {
            self.counters.deletes.fetch_add(1, Ordering::Relaxed);
            let freed = record.size_bytes() as u64;
            let bytes = &self.counters.bytes_resident;
            bytes.fetch_sub(freed.min(bytes.load(Ordering::Relaxed)), Ordering::Relaxed);
        }
        Ok(removed)
    }

    /// Accept a key migrated in from another shard: appends a
    /// `MigrationPut` frame and installs the record directly, preserving
    /// its version and timestamps (`spec.md` §4.2 migration).
    pub fn adopt_migrated(&self, record: Record, migration_id: u64) -> Result<()> {
        let frame = WalFrame::migration_put(
            0,
            Timestamp::now().as_nanos(),
            record.key.as_bytes().to_vec(),
            record.value.as_bytes().to_vec(),
            migration_id,
        );
        self.append_frame(frame)?;
        let size = record.size_bytes() as u64;
        self.table.insert(record.key.clone(), record);
        self.counters.bytes_resident.fetch_add(size, Ordering::Relaxed);
        Ok(())
    }

    /// Release a key migrated out to another shard: appends a
    /// `MigrationDelete` frame and removes the local copy.
    pub fn release_migrated(&self, key: &Key, migration_id: u64) -> Result<Option<Record>> {
        let frame = WalFrame::migration_delete(0, Timestamp::now().as_nanos(), key.as_bytes().to_vec(), migration_id);
        self.append_frame(frame)?;
        let removed = self.table.remove(key).map(|(_, record)| record);
        if let Some(record) = &removed {
            let freed = record.size_bytes() as u64;
            self.counters.bytes_resident.fetch_sub(freed.min(self.counters.bytes_resident.load(Ordering::Relaxed)), Ordering::Relaxed);
        }
        Ok(removed)
    }

    fn append_frame(&self, frame: WalFrame) -> Result<AppendReceipt> {
        self.wal.lock().append(frame)
    }

    /// Force the WAL to fsync now, regardless of durability mode. Used by
    /// the background flush worker for `Async`/`Grouped` shards.
    pub fn flush_wal(&self) -> Result<()> {
        self.wal.lock().flush()
    }

    /// Snapshot every record currently resident, for a full-shard scan
    /// (used by migration candidate selection).
    pub fn snapshot_keys(&self) -> Vec<Key> {
        self.table.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Appends since the WAL's last fsync, for `metrics()`.
    pub fn wal_pending_since_sync(&self) -> usize {
        self.wal.lock().pending_since_sync()
    }
}

fn apply_recovered_frame(
    table: &DashMap<Key, Record>,
    counters: &ShardCounters,
    max_version: &mut u64,
    shard_id: u16,
    frame: WalFrame,
) {
    use horizon_wal::FrameOp;

    let key = match Key::new(frame.key) {
        Ok(k) => k,
        Err(err) => {
            tracing::error!(error = %err, "dropping recovered frame with invalid key");
            return;
        }
    };

    match frame.op {
        FrameOp::Put | FrameOp::MigrationPut => {
            let value = Value::from(frame.value);
            let size = key.len() as u64 + value.len() as u64;
            let version = table.get(&key).map(|r| r.version + 1).unwrap_or(0);
            *max_version = (*max_version).max(version);
            // The key physically lives in this shard's own WAL/table
            // regardless of which shard originally wrote it (a
            // `MigrationPut` replayed here means this shard is the
            // migration's target), so the recovered record's `shard_id`
            // is always this shard's own id.
            let record = Record::new(key.clone(), value, version, shard_id, TierHint::default());
            if let Some(old) = table.insert(key, record) {
                counters.bytes_resident.fetch_sub(old.size_bytes() as u64, Ordering::Relaxed);
            }
            counters.bytes_resident.fetch_add(size, Ordering::Relaxed);
        }
        FrameOp::Delete | FrameOp::MigrationDelete => {
            if let Some((_, old)) = table.remove(&key) {
                counters.bytes_resident.fetch_sub(old.size_bytes() as u64, Ordering::Relaxed);
            }
        }
    }
}
