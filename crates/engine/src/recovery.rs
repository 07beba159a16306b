//! Startup recovery orchestration (`spec.md` §4.8 "Recovery Engine").
//!
//! Each shard replays its own WAL independently, so recovery fans out one
//! thread per shard and joins them; a corrupt sealed segment is fatal
//! (`Shard::open` -> `HorizonError::WalCorrupt`) and aborts the whole
//! engine open rather than silently starting with a partial shard set.

use std::path::Path;
use std::sync::Arc;

use horizon_core::{HorizonError, Limits, Result};
use horizon_storage::Shard;
use horizon_wal::DurabilityMode;

/// Open every shard directory under `data_root` in parallel, replaying its
/// WAL. Returns shards indexed by id, or the first error encountered.
pub fn recover_all(data_root: &Path, num_shards: u16, limits: Limits, durability: DurabilityMode) -> Result<Vec<Arc<Shard>>> {
    let handles: Vec<_> = (0..num_shards)
        .map(|id| {
            let shard_dir = data_root.join(format!("shard_{id:02}"));
            std::thread::Builder::new()
                .name(format!("horizon-recover-{id}"))
                .spawn(move || Shard::open(id, shard_dir, limits, durability))
                .expect("failed to spawn shard recovery thread")
        })
        .collect();

    let mut shards = Vec::with_capacity(num_shards as usize);
    let mut first_error = None;
    for handle in handles {
        match handle.join().unwrap_or_else(|panic| {
            Err(HorizonError::FatalIo(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("shard recovery thread panicked: {panic:?}"),
            )))
        }) {
            Ok(shard) => shards.push(Arc::new(shard)),
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    shards.sort_by_key(|s| s.id());
    Ok(shards)
}
