//! Nanosecond-precision timestamp type.
//!
//! Modeled on `stratadb_core::contract::Timestamp`, but at nanosecond
//! precision per `spec.md`'s `u64_ns` fields rather than microseconds.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time expressed as nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Read the current wall-clock time.
    ///
    /// Returns `EPOCH` if the system clock reports a time before the Unix
    /// epoch (e.g. clock skew during boot); this never panics.
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Timestamp(nanos as u64)
    }

    /// Construct a timestamp from a raw nanosecond count.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        Timestamp(nanos)
    }

    /// Raw nanosecond count since the Unix epoch.
    #[inline]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Milliseconds since the Unix epoch (truncating).
    #[inline]
    pub const fn as_millis(&self) -> u64 {
        self.0 / 1_000_000
    }

    /// Duration elapsed since an earlier timestamp, or `None` if `earlier`
    /// is actually later than `self`.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0.checked_sub(earlier.0).map(Duration::from_nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_after_epoch() {
        assert!(Timestamp::now() > Timestamp::EPOCH);
    }

    #[test]
    fn duration_since_orders_correctly() {
        let a = Timestamp::from_nanos(100);
        let b = Timestamp::from_nanos(250);
        assert_eq!(b.duration_since(a), Some(Duration::from_nanos(150)));
        assert_eq!(a.duration_since(b), None);
    }

    #[test]
    fn as_millis_truncates() {
        let t = Timestamp::from_nanos(1_999_999);
        assert_eq!(t.as_millis(), 1);
    }
}
