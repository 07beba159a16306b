//! Size limits for keys, values, and WAL segments.

/// Size limits enforced at the engine boundary.
///
/// Validation against these limits happens before any WAL interaction, so
/// an oversized key or value never produces a side effect (see
/// `spec.md` §4.1 "Edge policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum key length in bytes.
    pub max_key_bytes: usize,
    /// Maximum value length in bytes.
    pub max_value_bytes: usize,
    /// Maximum WAL segment size before rotation.
    pub max_segment_bytes: u64,
    /// Maximum WAL segment age before rotation, in milliseconds.
    pub max_segment_age_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_key_bytes: 1024,
            max_value_bytes: 16 * 1024 * 1024,
            max_segment_bytes: 128 * 1024 * 1024,
            max_segment_age_ms: 600_000,
        }
    }
}

impl Limits {
    /// Construct limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style override for key size.
    pub fn with_max_key_bytes(mut self, bytes: usize) -> Self {
        self.max_key_bytes = bytes;
        self
    }

    /// Builder-style override for value size.
    pub fn with_max_value_bytes(mut self, bytes: usize) -> Self {
        self.max_value_bytes = bytes;
        self
    }

    /// Builder-style override for segment rotation size.
    pub fn with_max_segment_bytes(mut self, bytes: u64) -> Self {
        self.max_segment_bytes = bytes;
        self
    }

    /// Builder-style override for segment rotation age.
    pub fn with_max_segment_age_ms(mut self, ms: u64) -> Self {
        self.max_segment_age_ms = ms;
        self
    }
}
