//! Error taxonomy for the horizon engine.
//!
//! `HorizonError` is the single error type surfaced by every public
//! operation. It follows the category split from the design: validation,
//! not-found, capacity, corruption, concurrency, and I/O.

use std::io;
use thiserror::Error;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, HorizonError>;

/// Unified error type for horizon operations.
#[derive(Debug, Error)]
pub enum HorizonError {
    // -- Validation --
    /// The supplied key exceeds `Limits::max_key_bytes`.
    #[error("key too large: {len} bytes (max {max})")]
    KeyTooLarge {
        /// Length of the offending key.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// The supplied value exceeds `Limits::max_value_bytes`.
    #[error("value too large: {len} bytes (max {max})")]
    ValueTooLarge {
        /// Length of the offending value.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A key was empty, which is never valid.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A configuration value was out of range or otherwise invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    // -- Not found --
    /// The requested key does not exist.
    #[error("key not found")]
    NotFound,

    // -- Capacity --
    /// The WAL could not accept a write (disk full, or a bounded append
    /// queue reached its backpressure limit).
    #[error("wal full: {0}")]
    WalFull(String),

    // -- Corruption --
    /// A segment header failed validation; the segment could not be opened.
    #[error("wal segment corrupt: {0}")]
    WalCorrupt(String),

    /// A single frame failed its CRC32 check during recovery. Recoverable:
    /// the segment is truncated at the last good frame boundary.
    #[error("wal frame corrupt: {0}")]
    FrameCorrupt(String),

    // -- Concurrency --
    /// The operation's deadline elapsed before it could complete.
    #[error("operation timed out")]
    Timeout,

    /// The engine is shutting down and no longer accepts new writes.
    #[error("engine is shutting down")]
    Shutdown,

    /// A migration could not be applied because of conflicting routing
    /// state (e.g. the target shard already owns the key).
    #[error("migration conflict: {0}")]
    MigrationConflict(String),

    /// The shard targeted by a routing decision is not available (e.g. the
    /// `override_shard` option named a shard id outside the configured
    /// range).
    #[error("shard unavailable: {0}")]
    ShardUnavailable(String),

    // -- I/O --
    /// A transient I/O failure; the caller may retry.
    #[error("transient I/O error: {0}")]
    TransientIo(#[source] io::Error),

    /// A fatal I/O failure that should be surfaced to the operator.
    #[error("fatal I/O error: {0}")]
    FatalIo(#[source] io::Error),
}

impl From<io::Error> for HorizonError {
    fn from(e: io::Error) -> Self {
        // Treat interrupted/would-block as transient, everything else as
        // fatal. Callers that know better construct the variant directly.
        match e.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => {
                HorizonError::TransientIo(e)
            }
            _ => HorizonError::FatalIo(e),
        }
    }
}

impl HorizonError {
    /// True for errors a caller may reasonably retry unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HorizonError::Timeout | HorizonError::TransientIo(_) | HorizonError::WalFull(_)
        )
    }

    /// True for errors that indicate on-disk data corruption was detected
    /// (and, for frame-level corruption, already handled by truncation).
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            HorizonError::WalCorrupt(_) | HorizonError::FrameCorrupt(_)
        )
    }

    /// True if the engine is no longer accepting writes.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, HorizonError::Shutdown)
    }
}
