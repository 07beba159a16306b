//! Crash recovery: scanning a shard's segments and replaying frames
//! (`spec.md` §4.4 "Recovery", §8 Scenario B "partial trailing frame").

use std::path::Path;

use horizon_core::{HorizonError, Result};

use crate::frame::{FrameDecodeError, WalFrame};
use crate::segment::{list_segments, WalSegment, SEGMENT_HEADER_SIZE};

/// Summary of a single shard's recovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoveryOutcome {
    /// The sequence number the writer should assign to the next new
    /// frame (one past the highest `seq` actually applied).
    pub next_seq: u64,
    /// Total number of frames successfully applied across all segments.
    pub frames_applied: u64,
    /// Bytes discarded from the tail of the active segment because they
    /// formed a partial or corrupt trailing frame.
    pub truncated_bytes: u64,
}

/// Scan every segment in `shard_dir` ascending by `seq_base`, decode and
/// hand each valid frame to `apply` in order, and repair a truncated
/// trailing write by discarding the partial frame.
///
/// Only the *last* segment is allowed to end in a partial/corrupt frame
/// (the active segment at crash time); a decode failure in an earlier,
/// already-sealed segment is treated as unrecoverable corruption.
pub fn recover_shard<F>(shard_dir: &Path, mut apply: F) -> Result<RecoveryOutcome>
where
    F: FnMut(WalFrame),
{
    let seq_bases = list_segments(shard_dir).map_err(|e| HorizonError::WalCorrupt(e.to_string()))?;

    let mut outcome = RecoveryOutcome::default();

    let last_index = seq_bases.len().checked_sub(1);
    for (index, &seq_base) in seq_bases.iter().enumerate() {
        let is_last = Some(index) == last_index;
        let mut segment = WalSegment::open_read(shard_dir, seq_base)
            .map_err(|e| HorizonError::WalCorrupt(format!("opening segment {seq_base}: {e}")))?;
        let region = segment
            .read_frame_region()
            .map_err(|e| HorizonError::WalCorrupt(format!("reading segment {seq_base}: {e}")))?;

        let mut offset = 0usize;
        loop {
            if offset >= region.len() {
                break;
            }
            match WalFrame::from_bytes(&region[offset..]) {
                Ok((frame, consumed)) => {
                    outcome.next_seq = outcome.next_seq.max(frame.seq + 1);
                    outcome.frames_applied += 1;
                    apply(frame);
                    offset += consumed;
                }
                Err(FrameDecodeError::InsufficientData { .. }) if is_last => {
                    let discarded = (region.len() - offset) as u64;
                    truncate_active(shard_dir, seq_base, SEGMENT_HEADER_SIZE as u64 + offset as u64)?;
                    outcome.truncated_bytes += discarded;
                    break;
                }
                Err(err) if is_last => {
                    tracing::warn!(
                        segment = seq_base,
                        offset,
                        error = %err,
                        "discarding corrupt trailing frame"
                    );
                    let discarded = (region.len() - offset) as u64;
                    truncate_active(shard_dir, seq_base, SEGMENT_HEADER_SIZE as u64 + offset as u64)?;
                    outcome.truncated_bytes += discarded;
                    break;
                }
                Err(err) => {
                    return Err(HorizonError::WalCorrupt(format!(
                        "segment {seq_base} (not the active segment) is corrupt at offset {offset}: {err}"
                    )));
                }
            }
        }
    }

    Ok(outcome)
}

fn truncate_active(shard_dir: &Path, seq_base: u64, keep_bytes: u64) -> Result<()> {
    let mut segment = WalSegment::open_append(shard_dir, seq_base)
        .map_err(|e| HorizonError::WalCorrupt(format!("reopening segment {seq_base} for truncation: {e}")))?;
    segment
        .truncate(keep_bytes)
        .map_err(|e| HorizonError::WalCorrupt(format!("truncating segment {seq_base}: {e}")))?;
    segment
        .sync()
        .map_err(|e| HorizonError::WalCorrupt(format!("syncing truncated segment {seq_base}: {e}")))?;
    Ok(())
}
