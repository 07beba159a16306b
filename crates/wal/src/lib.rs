//! Append-only per-shard write-ahead log.
//!
//! Each shard owns an independent sequence of segment files under its own
//! directory (`spec.md` §4.4, §6). [`frame`] defines the on-disk frame
//! format, [`segment`] the file that holds a run of frames, [`writer`]
//! assigns sequence numbers and drives rotation/durability, and
//! [`recovery`] replays a shard's segments after a restart.

#![warn(missing_docs)]

pub mod frame;
pub mod recovery;
pub mod segment;
pub mod writer;

pub use frame::{FrameDecodeError, FrameOp, WalFrame, FRAME_MAGIC};
pub use recovery::{recover_shard, RecoveryOutcome};
pub use segment::{list_segments, SegmentError, SegmentHeader, WalSegment, SEGMENT_FORMAT_VERSION, SEGMENT_MAGIC};
pub use writer::{AppendReceipt, DurabilityMode, WalWriter};
