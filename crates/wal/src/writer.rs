//! Per-shard WAL writer: durability modes and segment rotation
//! (`spec.md` §4.4 "Durability modes", §6 "Rotation thresholds").

use std::path::PathBuf;
use std::time::{Duration, Instant};

use horizon_core::{HorizonError, Limits, Result};

use crate::frame::WalFrame;
use crate::segment::{list_segments, WalSegment, SEGMENT_HEADER_SIZE};

/// Controls when an appended frame's bytes are fsync'd to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// Never sync from `append` itself; a background worker calls
    /// [`WalWriter::flush`] on its own schedule. Lowest latency, largest
    /// window of unsynced writes lost on crash.
    Async,
    /// Sync after `max_batch` appends or `max_delay` have elapsed since
    /// the last sync, whichever comes first.
    Grouped {
        /// Number of appends to accumulate before a sync.
        max_batch: usize,
        /// Maximum time to hold unsynced appends.
        max_delay: Duration,
    },
    /// Sync after every single append. Highest durability, highest
    /// per-write latency.
    Sync,
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::Grouped {
            max_batch: 64,
            max_delay: Duration::from_millis(5),
        }
    }
}

/// Outcome of a single `append` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Sequence number assigned to the appended frame.
    pub seq: u64,
    /// Whether the frame's bytes are guaranteed durable (fsync'd) as of
    /// this call's return.
    pub synced: bool,
    /// Whether this append triggered a segment rotation.
    pub rotated: bool,
}

/// Owns one shard's active WAL segment and assigns monotonically
/// increasing sequence numbers to every appended frame.
pub struct WalWriter {
    shard_dir: PathBuf,
    active: WalSegment,
    next_seq: u64,
    limits: Limits,
    mode: DurabilityMode,
    pending_since_sync: usize,
    last_sync_at: Instant,
}

impl WalWriter {
    /// Open (or create) the writer for a shard directory, resuming at
    /// the highest-numbered existing segment if one exists.
    pub fn open(shard_dir: PathBuf, limits: Limits, mode: DurabilityMode) -> Result<Self> {
        let existing = list_segments(&shard_dir)
            .map_err(|e| HorizonError::WalCorrupt(e.to_string()))?;

        let active = match existing.last() {
            Some(&seq_base) => {
                WalSegment::open_append(&shard_dir, seq_base).map_err(|e| {
                    HorizonError::WalCorrupt(format!("reopening active segment: {e}"))
                })?
            }
            None => WalSegment::create(&shard_dir, 0, horizon_core::Timestamp::now().as_nanos())
                .map_err(|e| HorizonError::WalCorrupt(format!("creating first segment: {e}")))?,
        };

        // next_seq tracks the frame sequence space, not the segment's
        // seq_base; the caller (recovery) is responsible for telling us
        // the true next frame seq once the active segment has been
        // scanned. Until then we assume an empty or freshly-created
        // segment and start at its seq_base.
        let next_seq = active.seq_base();

        Ok(WalWriter {
            shard_dir,
            active,
            next_seq,
            limits,
            mode,
            pending_since_sync: 0,
            last_sync_at: Instant::now(),
        })
    }

    /// Tell the writer the next frame sequence number to assign, used by
    /// the recovery path after scanning the active segment's existing
    /// frames.
    pub fn set_next_seq(&mut self, next_seq: u64) {
        self.next_seq = next_seq;
    }

    /// Current active segment's `seq_base`, for diagnostics.
    pub fn active_seq_base(&self) -> u64 {
        self.active.seq_base()
    }

    fn needs_rotation(&self) -> bool {
        self.active.size() >= self.limits.max_segment_bytes
            || self.active.age() >= Duration::from_millis(self.limits.max_segment_age_ms)
    }

    fn rotate(&mut self) -> Result<()> {
        self.active
            .seal()
            .map_err(|e| HorizonError::WalCorrupt(format!("sealing segment: {e}")))?;
        let fresh = WalSegment::create(
            &self.shard_dir,
            self.next_seq,
            horizon_core::Timestamp::now().as_nanos(),
        )
        .map_err(|e| HorizonError::WalCorrupt(format!("rotating segment: {e}")))?;
        self.active = fresh;
        self.pending_since_sync = 0;
        self.last_sync_at = Instant::now();
        Ok(())
    }

    /// Assign a sequence number to `frame_without_seq`, encode it, append
    /// to the active segment (rotating first if the segment is over its
    /// size/age threshold), and apply the durability policy.
    ///
    /// `frame_without_seq`'s `seq` field is overwritten with the assigned
    /// sequence number before encoding.
    pub fn append(&mut self, mut frame: WalFrame) -> Result<AppendReceipt> {
        let mut rotated = false;
        if self.active.size() > SEGMENT_HEADER_SIZE as u64 && self.needs_rotation() {
            self.rotate()?;
            rotated = true;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        frame.seq = seq;

        let bytes = frame.to_bytes();
        self.active
            .append(&bytes)
            .map_err(|e| HorizonError::TransientIo(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.pending_since_sync += 1;

        let synced = self.maybe_sync()?;

        Ok(AppendReceipt { seq, synced, rotated })
    }

    fn maybe_sync(&mut self) -> Result<bool> {
        let should_sync = match self.mode {
            DurabilityMode::Sync => true,
            DurabilityMode::Async => false,
            DurabilityMode::Grouped { max_batch, max_delay } => {
                self.pending_since_sync >= max_batch || self.last_sync_at.elapsed() >= max_delay
            }
        };

        if should_sync {
            self.flush()?;
        }
        Ok(should_sync)
    }

    /// Force an fsync of the active segment now, regardless of durability
    /// mode. Called by [`maybe_sync`](Self::maybe_sync) and by the
    /// background flush worker for `Async`/`Grouped` writers.
    pub fn flush(&mut self) -> Result<()> {
        self.active
            .sync()
            .map_err(|e| HorizonError::TransientIo(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        self.pending_since_sync = 0;
        self.last_sync_at = Instant::now();
        Ok(())
    }

    /// Number of appends since the last sync, for monitoring/backpressure.
    pub fn pending_since_sync(&self) -> usize {
        self.pending_since_sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tiny_limits() -> Limits {
        Limits::default()
            .with_max_segment_bytes(256)
            .with_max_segment_age_ms(3_600_000)
    }

    #[test]
    fn sync_mode_syncs_every_append() {
        let dir = tempdir().unwrap();
        let mut writer = WalWriter::open(dir.path().to_path_buf(), Limits::default(), DurabilityMode::Sync).unwrap();
        let frame = WalFrame::put(0, 0, b"k".to_vec(), b"v".to_vec());
        let receipt = writer.append(frame).unwrap();
        assert!(receipt.synced);
        assert_eq!(receipt.seq, 0);
    }

    #[test]
    fn async_mode_never_syncs_until_flush() {
        let dir = tempdir().unwrap();
        let mut writer = WalWriter::open(dir.path().to_path_buf(), Limits::default(), DurabilityMode::Async).unwrap();
        let frame = WalFrame::put(0, 0, b"k".to_vec(), b"v".to_vec());
        let receipt = writer.append(frame).unwrap();
        assert!(!receipt.synced);
        assert_eq!(writer.pending_since_sync(), 1);
        writer.flush().unwrap();
        assert_eq!(writer.pending_since_sync(), 0);
    }

    #[test]
    fn grouped_mode_syncs_after_max_batch() {
        let dir = tempdir().unwrap();
        let mode = DurabilityMode::Grouped {
            max_batch: 2,
            max_delay: Duration::from_secs(3600),
        };
        let mut writer = WalWriter::open(dir.path().to_path_buf(), Limits::default(), mode).unwrap();

        let r1 = writer.append(WalFrame::put(0, 0, b"a".to_vec(), b"1".to_vec())).unwrap();
        assert!(!r1.synced);
        let r2 = writer.append(WalFrame::put(0, 0, b"b".to_vec(), b"2".to_vec())).unwrap();
        assert!(r2.synced);
    }

    #[test]
    fn sequence_numbers_increase_monotonically() {
        let dir = tempdir().unwrap();
        let mut writer = WalWriter::open(dir.path().to_path_buf(), Limits::default(), DurabilityMode::Async).unwrap();
        let r1 = writer.append(WalFrame::put(0, 0, b"a".to_vec(), b"1".to_vec())).unwrap();
        let r2 = writer.append(WalFrame::put(0, 0, b"b".to_vec(), b"2".to_vec())).unwrap();
        assert_eq!(r2.seq, r1.seq + 1);
    }

    #[test]
    fn rotation_triggers_when_segment_exceeds_size_limit() {
        let dir = tempdir().unwrap();
        let mut writer = WalWriter::open(dir.path().to_path_buf(), tiny_limits(), DurabilityMode::Sync).unwrap();

        let big_value = vec![0u8; 512];
        writer
            .append(WalFrame::put(0, 0, b"first".to_vec(), big_value.clone()))
            .unwrap();
        let second = writer
            .append(WalFrame::put(0, 0, b"second".to_vec(), big_value))
            .unwrap();

        assert!(second.rotated);
        assert_eq!(writer.active_seq_base(), second.seq);
    }

    #[test]
    fn reopening_resumes_from_highest_segment() {
        let dir = tempdir().unwrap();
        {
            let mut writer = WalWriter::open(dir.path().to_path_buf(), tiny_limits(), DurabilityMode::Sync).unwrap();
            let big_value = vec![0u8; 512];
            writer.append(WalFrame::put(0, 0, b"a".to_vec(), big_value.clone())).unwrap();
            writer.append(WalFrame::put(0, 0, b"b".to_vec(), big_value)).unwrap();
        }
        let reopened = WalWriter::open(dir.path().to_path_buf(), tiny_limits(), DurabilityMode::Sync).unwrap();
        assert!(reopened.active_seq_base() > 0);
    }
}
