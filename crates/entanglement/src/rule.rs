//! Entanglement rules: pattern -> related patterns (`spec.md` §3
//! `EntanglementRule`, §4.6 "single `*` wildcard matching a terminal
//! segment").

use horizon_core::{HorizonError, Key};

/// A configured association between one key pattern and the patterns of
/// keys considered "related" to it.
///
/// Patterns are `:`-delimited segment lists where at most one segment is
/// the literal wildcard `*`. A key matches a pattern only if it has the
/// same number of segments and every non-wildcard segment matches
/// exactly; the wildcard segment's actual value is captured and spliced
/// into each `related` pattern's own wildcard segment to produce
/// concrete related keys.
#[derive(Debug, Clone)]
pub struct EntanglementRule {
    /// Pattern a probe key is matched against.
    pub key_pattern: String,
    /// Patterns describing related keys, each with its own `*`.
    pub related: Vec<String>,
    /// Hard cap on how many related keys this rule may contribute.
    pub max_fanout: u16,
    /// Relative prefetch priority, in `[0, 1]`.
    pub strength: f32,
}

impl EntanglementRule {
    /// Construct a rule, validating `strength` is within `[0, 1]`.
    pub fn new(
        key_pattern: impl Into<String>,
        related: Vec<String>,
        max_fanout: u16,
        strength: f32,
    ) -> Result<Self, HorizonError> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(HorizonError::InvalidConfig(format!(
                "entanglement rule strength {strength} out of range [0, 1]"
            )));
        }
        Ok(EntanglementRule {
            key_pattern: key_pattern.into(),
            related,
            max_fanout,
            strength,
        })
    }

    /// If `key` matches this rule's `key_pattern`, return the bytes
    /// captured by the wildcard segment (or an empty slice, for a
    /// wildcard-free pattern).
    pub fn capture<'a>(&self, key: &'a Key) -> Option<&'a [u8]> {
        let pattern_segments: Vec<&str> = self.key_pattern.split(':').collect();
        let key_segments: Vec<&[u8]> = key.segments().collect();

        if pattern_segments.len() != key_segments.len() {
            return None;
        }

        let mut captured: Option<&'a [u8]> = None;
        for (pattern_seg, key_seg) in pattern_segments.iter().zip(key_segments.iter()) {
            if *pattern_seg == "*" {
                captured = Some(key_seg);
            } else if pattern_seg.as_bytes() != *key_seg {
                return None;
            }
        }
        Some(captured.unwrap_or(&[]))
    }

    /// Expand this rule against a matched `key`, producing up to
    /// `max_fanout` concrete related keys. Returns an empty vector if the
    /// key doesn't match `key_pattern`, or if a related pattern turns out
    /// to require a capture but none was taken.
    pub fn expand(&self, key: &Key) -> Vec<Key> {
        let Some(capture) = self.capture(key) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for pattern in &self.related {
            if out.len() >= self.max_fanout as usize {
                break;
            }
            let segments: Vec<&str> = pattern.split(':').collect();
            let mut bytes = Vec::new();
            for (i, seg) in segments.iter().enumerate() {
                if i > 0 {
                    bytes.push(b':');
                }
                if *seg == "*" {
                    bytes.extend_from_slice(capture);
                } else {
                    bytes.extend_from_slice(seg.as_bytes());
                }
            }
            if let Ok(related_key) = Key::new(bytes) {
                out.push(related_key);
            }
        }
        out
    }
}
