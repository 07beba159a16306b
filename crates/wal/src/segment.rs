//! WAL segment files (`spec.md` §4.4 "Segment layout").
//!
//! Segments live one-per-shard-directory as `shard_XX/NNNNNNNN.wal`, where
//! `NNNNNNNN` is the zero-padded `seq_base` of the first frame the segment
//! may contain. Only the active (unsealed) segment is writable; sealed
//! segments are immutable (`spec.md` §3 `WalSegment` invariants).

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a horizon WAL segment file.
pub const SEGMENT_MAGIC: [u8; 4] = *b"HZWS";

/// Current on-disk segment format version.
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

/// Size of the segment header, in bytes.
pub const SEGMENT_HEADER_SIZE: usize = 32;

/// Segment header, written once at offset 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Magic bytes, must equal [`SEGMENT_MAGIC`].
    pub magic: [u8; 4],
    /// On-disk format version.
    pub format_version: u32,
    /// Sequence number of the first frame this segment may contain.
    pub seq_base: u64,
    /// Wall-clock time the segment was created.
    pub creation_ns: u64,
    /// Reserved for future use; always zero today.
    pub reserved: [u8; 8],
}

impl SegmentHeader {
    /// Construct a new header for a freshly-created segment.
    pub fn new(seq_base: u64, creation_ns: u64) -> Self {
        SegmentHeader {
            magic: SEGMENT_MAGIC,
            format_version: SEGMENT_FORMAT_VERSION,
            seq_base,
            creation_ns,
            reserved: [0; 8],
        }
    }

    fn to_bytes(self) -> [u8; SEGMENT_HEADER_SIZE] {
        let mut buf = [0u8; SEGMENT_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.seq_base.to_le_bytes());
        buf[16..24].copy_from_slice(&self.creation_ns.to_le_bytes());
        buf[24..32].copy_from_slice(&self.reserved);
        buf
    }

    fn from_bytes(buf: &[u8; SEGMENT_HEADER_SIZE]) -> Self {
        SegmentHeader {
            magic: buf[0..4].try_into().unwrap(),
            format_version: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            seq_base: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            creation_ns: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            reserved: buf[24..32].try_into().unwrap(),
        }
    }

    /// True if the magic bytes are correct. A bad magic means the whole
    /// segment must be refused (`WalCorrupt`), not merely truncated.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC
    }
}

/// Errors produced while opening or validating a segment header.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// An I/O failure occurred opening, reading, or writing the segment.
    #[error("segment I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The header's magic bytes were wrong.
    #[error("bad segment magic in {path:?}")]
    BadMagic {
        /// Path of the offending segment file.
        path: PathBuf,
    },
    /// The header declared a `seq_base` that does not match the file name.
    #[error("seq_base mismatch in {path:?}: header says {header}, filename says {filename}")]
    SeqBaseMismatch {
        /// Path of the offending segment file.
        path: PathBuf,
        /// `seq_base` recorded in the header.
        header: u64,
        /// `seq_base` implied by the file name.
        filename: u64,
    },
}

/// A single WAL segment file handle.
pub struct WalSegment {
    file: File,
    seq_base: u64,
    write_position: u64,
    path: PathBuf,
    sealed: bool,
    created_at: std::time::Instant,
}

/// List the `seq_base` of every segment file in `shard_dir`, ascending.
/// Missing directories are treated as empty (a shard that has never
/// written anything yet).
pub fn list_segments(shard_dir: &Path) -> Result<Vec<u64>, SegmentError> {
    if !shard_dir.exists() {
        return Ok(Vec::new());
    }
    let mut bases = Vec::new();
    for entry in std::fs::read_dir(shard_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(".wal") {
            if let Ok(seq_base) = stem.parse::<u64>() {
                bases.push(seq_base);
            }
        }
    }
    bases.sort_unstable();
    Ok(bases)
}

impl WalSegment {
    /// Compute the file path for a segment with the given `seq_base`,
    /// inside `shard_dir`.
    pub fn segment_path(shard_dir: &Path, seq_base: u64) -> PathBuf {
        shard_dir.join(format!("{seq_base:08}.wal"))
    }

    /// Create a brand-new, writable segment.
    pub fn create(shard_dir: &Path, seq_base: u64, creation_ns: u64) -> Result<Self, SegmentError> {
        std::fs::create_dir_all(shard_dir)?;
        let path = Self::segment_path(shard_dir, seq_base);
        let mut file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)?;

        let header = SegmentHeader::new(seq_base, creation_ns);
        file.write_all(&header.to_bytes())?;

        Ok(WalSegment {
            file,
            seq_base,
            write_position: SEGMENT_HEADER_SIZE as u64,
            path,
            sealed: false,
            created_at: std::time::Instant::now(),
        })
    }

    /// Open an existing segment for appending (used when resuming writes
    /// to the previously-active segment after a clean restart).
    pub fn open_append(shard_dir: &Path, seq_base: u64) -> Result<Self, SegmentError> {
        let path = Self::segment_path(shard_dir, seq_base);
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let header = Self::read_header(&mut file, &path)?;
        let write_position = file.seek(SeekFrom::End(0))?;

        Ok(WalSegment {
            file,
            seq_base: header.seq_base,
            write_position,
            path,
            sealed: false,
            created_at: std::time::Instant::now(),
        })
    }

    /// Open an existing segment read-only, for recovery scanning.
    pub fn open_read(shard_dir: &Path, seq_base: u64) -> Result<Self, SegmentError> {
        let path = Self::segment_path(shard_dir, seq_base);
        let mut file = OpenOptions::new().read(true).open(&path)?;
        let header = Self::read_header(&mut file, &path)?;
        let write_position = file.seek(SeekFrom::End(0))?;

        Ok(WalSegment {
            file,
            seq_base: header.seq_base,
            write_position,
            path,
            sealed: true,
            created_at: std::time::Instant::now(),
        })
    }

    fn read_header(file: &mut File, path: &Path) -> Result<SegmentHeader, SegmentError> {
        file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; SEGMENT_HEADER_SIZE];
        file.read_exact(&mut buf)?;
        let header = SegmentHeader::from_bytes(&buf);
        if !header.is_valid() {
            return Err(SegmentError::BadMagic { path: path.to_path_buf() });
        }
        Ok(header)
    }

    /// This segment's `seq_base`.
    pub fn seq_base(&self) -> u64 {
        self.seq_base
    }

    /// Current size in bytes, including the header.
    pub fn size(&self) -> u64 {
        self.write_position
    }

    /// Path to the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How long ago this segment was created (or opened for append),
    /// used for the age-based rotation threshold.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Append raw bytes (an already-encoded frame) to the segment.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), SegmentError> {
        if self.sealed {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "cannot write to a sealed segment",
            )
            .into());
        }
        self.file.seek(SeekFrom::Start(self.write_position))?;
        self.file.write_all(bytes)?;
        self.write_position += bytes.len() as u64;
        Ok(())
    }

    /// fsync the segment's file contents to disk.
    pub fn sync(&mut self) -> Result<(), SegmentError> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Seal the segment: fsync and mark immutable. A sealed segment can
    /// still be read, just never written again.
    pub fn seal(&mut self) -> Result<(), SegmentError> {
        if !self.sealed {
            self.file.sync_all()?;
            self.sealed = true;
        }
        Ok(())
    }

    /// True if the segment has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Truncate the segment at `position`, discarding everything after it.
    /// Used during recovery to drop a partial trailing frame.
    pub fn truncate(&mut self, position: u64) -> Result<(), SegmentError> {
        self.file.set_len(position)?;
        self.write_position = position;
        self.file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    /// Read the full frame region (everything after the header) into
    /// memory, for recovery scanning.
    pub fn read_frame_region(&mut self) -> Result<Vec<u8>, SegmentError> {
        self.file.seek(SeekFrom::Start(SEGMENT_HEADER_SIZE as u64))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_then_open_read_roundtrips_header() {
        let dir = tempdir().unwrap();
        {
            let segment = WalSegment::create(dir.path(), 1, 123).unwrap();
            assert_eq!(segment.seq_base(), 1);
            assert_eq!(segment.size(), SEGMENT_HEADER_SIZE as u64);
            assert!(!segment.is_sealed());
        }

        let segment = WalSegment::open_read(dir.path(), 1).unwrap();
        assert_eq!(segment.seq_base(), 1);
        assert!(segment.is_sealed());
    }

    #[test]
    fn append_grows_size_and_seal_blocks_writes() {
        let dir = tempdir().unwrap();
        let mut segment = WalSegment::create(dir.path(), 1, 0).unwrap();
        let before = segment.size();
        segment.append(b"hello").unwrap();
        assert_eq!(segment.size(), before + 5);

        segment.seal().unwrap();
        assert!(segment.append(b"more").is_err());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = WalSegment::segment_path(dir.path(), 1);
        std::fs::write(&path, [0u8; SEGMENT_HEADER_SIZE]).unwrap();
        let result = WalSegment::open_read(dir.path(), 1);
        assert!(matches!(result, Err(SegmentError::BadMagic { .. })));
    }

    #[test]
    fn truncate_drops_trailing_bytes() {
        let dir = tempdir().unwrap();
        let mut segment = WalSegment::create(dir.path(), 1, 0).unwrap();
        segment.append(b"good-frame-bytes").unwrap();
        let good_end = segment.size();
        segment.append(b"partial-garbage").unwrap();
        segment.truncate(good_end).unwrap();
        assert_eq!(segment.size(), good_end);
    }

    #[test]
    fn list_segments_returns_ascending_seq_bases() {
        let dir = tempdir().unwrap();
        WalSegment::create(dir.path(), 5, 0).unwrap();
        WalSegment::create(dir.path(), 1, 0).unwrap();
        WalSegment::create(dir.path(), 3, 0).unwrap();
        assert_eq!(list_segments(dir.path()).unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn list_segments_on_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("shard_07");
        assert_eq!(list_segments(&missing).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn segment_path_zero_pads_seq_base() {
        let dir = Path::new("/data/shard_00");
        assert_eq!(
            WalSegment::segment_path(dir, 7),
            PathBuf::from("/data/shard_00/00000007.wal")
        );
    }

    #[test]
    fn resume_open_append_preserves_prior_bytes() {
        let dir = tempdir().unwrap();
        {
            let mut segment = WalSegment::create(dir.path(), 1, 0).unwrap();
            segment.append(b"first").unwrap();
            segment.sync().unwrap();
        }
        {
            let mut segment = WalSegment::open_append(dir.path(), 1).unwrap();
            segment.append(b"second").unwrap();
        }
        let mut segment = WalSegment::open_read(dir.path(), 1).unwrap();
        let region = segment.read_frame_region().unwrap();
        assert_eq!(region, b"firstsecond");
    }
}
