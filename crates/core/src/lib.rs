//! Core types shared across the horizon key-value engine.
//!
//! This crate defines the foundational vocabulary used by every other
//! `horizon-*` crate:
//! - [`Key`] / [`Value`]: bounds-checked byte buffers.
//! - [`Timestamp`]: nanosecond-precision clock reading.
//! - [`Record`]: the unit of storage owned by a shard.
//! - [`TierHint`] / [`AccessPattern`]: cache placement hints.
//! - [`HorizonError`]: the error taxonomy used throughout the engine.
//! - [`Limits`]: size limits for keys, values, and WAL segments.

#![warn(missing_docs)]

pub mod error;
pub mod key;
pub mod limits;
pub mod opts;
pub mod record;
pub mod timestamp;
pub mod value;

pub use error::{HorizonError, Result};
pub use key::Key;
pub use limits::Limits;
pub use opts::{AccessPattern, Consistency, GetOptions, Priority, PutOptions};
pub use record::{Record, TierHint};
pub use timestamp::Timestamp;
pub use value::Value;
