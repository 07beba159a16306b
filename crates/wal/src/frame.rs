//! WAL frame encoding (`spec.md` §4.4).
//!
//! ```text
//! magic (4) | seq (8) | op (1) | flags (1) | timestamp_ns (8)
//!   | key_len (4) | value_len (4) | [migration_id (8)] | key | value | crc32 (4)
//! ```
//!
//! The CRC32 covers every preceding byte of the frame. Frames never
//! straddle segments (`spec.md` §3 `WalSegment` invariants).

use crc32fast::Hasher;

/// Magic bytes identifying a horizon WAL frame: "WAP1" read as a
/// little-endian u32, per `spec.md` §4.4.
pub const FRAME_MAGIC: u32 = 0x5741_5031;

const FLAG_COMPRESSED: u8 = 0b0000_0001;
const FLAG_MIGRATION_ID: u8 = 0b0000_0010;

/// The operation a frame records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOp {
    /// A PUT of `key` -> `value`.
    Put = 1,
    /// A DELETE of `key` (value is empty).
    Delete = 2,
    /// The target-side half of a migration: target shard adopts the key.
    MigrationPut = 3,
    /// The source-side half of a migration: source shard drops the key.
    MigrationDelete = 4,
}

impl FrameOp {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(FrameOp::Put),
            2 => Some(FrameOp::Delete),
            3 => Some(FrameOp::MigrationPut),
            4 => Some(FrameOp::MigrationDelete),
            _ => None,
        }
    }
}

/// A single decoded WAL frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalFrame {
    /// Sequence number, strictly increasing within a segment.
    pub seq: u64,
    /// Operation recorded by this frame.
    pub op: FrameOp,
    /// Wall-clock time the frame was appended.
    pub timestamp_ns: u64,
    /// The affected key's raw bytes.
    pub key: Vec<u8>,
    /// The value's raw bytes (empty for `Delete`/`MigrationDelete`).
    pub value: Vec<u8>,
    /// Present on `MigrationPut`/`MigrationDelete` frames: pairs the two
    /// halves of one migration (`spec.md` §4.2 failure modes).
    pub migration_id: Option<u64>,
}

/// Errors produced while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameDecodeError {
    /// Fewer bytes are available than the frame needs.
    #[error("insufficient data: need at least {need} bytes, have {have}")]
    InsufficientData {
        /// Bytes required to decode the next field.
        need: usize,
        /// Bytes actually available.
        have: usize,
    },
    /// The magic number did not match [`FRAME_MAGIC`].
    #[error("bad frame magic: {0:#010x}")]
    BadMagic(u32),
    /// The `op` byte did not map to a known [`FrameOp`].
    #[error("unknown frame op byte: {0}")]
    UnknownOp(u8),
    /// The trailing CRC32 did not match the computed checksum.
    #[error("crc32 mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the decoded bytes.
        computed: u32,
    },
}

impl WalFrame {
    /// Construct a `Put` frame.
    pub fn put(seq: u64, timestamp_ns: u64, key: Vec<u8>, value: Vec<u8>) -> Self {
        WalFrame {
            seq,
            op: FrameOp::Put,
            timestamp_ns,
            key,
            value,
            migration_id: None,
        }
    }

    /// Construct a `Delete` frame.
    pub fn delete(seq: u64, timestamp_ns: u64, key: Vec<u8>) -> Self {
        WalFrame {
            seq,
            op: FrameOp::Delete,
            timestamp_ns,
            key,
            value: Vec::new(),
            migration_id: None,
        }
    }

    /// Construct the target-side half of a migration.
    pub fn migration_put(
        seq: u64,
        timestamp_ns: u64,
        key: Vec<u8>,
        value: Vec<u8>,
        migration_id: u64,
    ) -> Self {
        WalFrame {
            seq,
            op: FrameOp::MigrationPut,
            timestamp_ns,
            key,
            value,
            migration_id: Some(migration_id),
        }
    }

    /// Construct the source-side half of a migration.
    pub fn migration_delete(seq: u64, timestamp_ns: u64, key: Vec<u8>, migration_id: u64) -> Self {
        WalFrame {
            seq,
            op: FrameOp::MigrationDelete,
            timestamp_ns,
            key,
            value: Vec::new(),
            migration_id: Some(migration_id),
        }
    }

    /// Encode this frame to its on-disk byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let has_migration_id = self.migration_id.is_some();
        let flags = if has_migration_id { FLAG_MIGRATION_ID } else { 0 };

        let mut buf = Vec::with_capacity(
            30 + if has_migration_id { 8 } else { 0 } + self.key.len() + self.value.len() + 4,
        );
        buf.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        buf.extend_from_slice(&self.seq.to_le_bytes());
        buf.push(self.op as u8);
        buf.push(flags);
        buf.extend_from_slice(&self.timestamp_ns.to_le_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_le_bytes());
        if let Some(mid) = self.migration_id {
            buf.extend_from_slice(&mid.to_le_bytes());
        }
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);

        let crc = crc32(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Decode a frame from the head of `bytes`, returning the frame and the
    /// number of bytes consumed. Never reads past the declared lengths, so
    /// a truncated trailing frame is reported as `InsufficientData` rather
    /// than panicking — recovery uses this to find the last good boundary.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), FrameDecodeError> {
        const FIXED_HEADER: usize = 4 + 8 + 1 + 1 + 8 + 4 + 4; // 30 bytes

        if bytes.len() < FIXED_HEADER {
            return Err(FrameDecodeError::InsufficientData {
                need: FIXED_HEADER,
                have: bytes.len(),
            });
        }

        let magic = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        if magic != FRAME_MAGIC {
            return Err(FrameDecodeError::BadMagic(magic));
        }

        let seq = u64::from_le_bytes(bytes[4..12].try_into().unwrap());
        let op_byte = bytes[12];
        let op = FrameOp::from_u8(op_byte).ok_or(FrameDecodeError::UnknownOp(op_byte))?;
        let flags = bytes[13];
        let timestamp_ns = u64::from_le_bytes(bytes[14..22].try_into().unwrap());
        let key_len = u32::from_le_bytes(bytes[22..26].try_into().unwrap()) as usize;
        let value_len = u32::from_le_bytes(bytes[26..30].try_into().unwrap()) as usize;

        let mut offset = FIXED_HEADER;
        let has_migration_id = flags & FLAG_MIGRATION_ID != 0;
        let migration_id = if has_migration_id {
            if bytes.len() < offset + 8 {
                return Err(FrameDecodeError::InsufficientData {
                    need: offset + 8,
                    have: bytes.len(),
                });
            }
            let mid = u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap());
            offset += 8;
            Some(mid)
        } else {
            None
        };

        let total_before_crc = offset + key_len + value_len;
        let total = total_before_crc + 4;
        if bytes.len() < total {
            return Err(FrameDecodeError::InsufficientData {
                need: total,
                have: bytes.len(),
            });
        }

        let key = bytes[offset..offset + key_len].to_vec();
        let value = bytes[offset + key_len..total_before_crc].to_vec();

        let expected_crc =
            u32::from_le_bytes(bytes[total_before_crc..total].try_into().unwrap());
        let computed_crc = crc32(&bytes[..total_before_crc]);
        if expected_crc != computed_crc {
            return Err(FrameDecodeError::ChecksumMismatch {
                expected: expected_crc,
                computed: computed_crc,
            });
        }

        let _ = FLAG_COMPRESSED; // reserved, never set today

        Ok((
            WalFrame {
                seq,
                op,
                timestamp_ns,
                key,
                value,
                migration_id,
            },
            total,
        ))
    }
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
