//! Bounds-checked value buffer.

use crate::error::HorizonError;

/// Hard ceiling on value length, independent of any configured `Limits`.
pub const MAX_VALUE_BYTES: usize = 16 * 1024 * 1024;

/// An owned, bounds-checked value.
///
/// A zero-length value is permitted (`spec.md` §8: "value_len == 0 is
/// allowed"); it is distinct from a delete, which removes the record
/// entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value(Vec<u8>);

impl Value {
    /// Validate and wrap a byte buffer as a value, checked against
    /// `MAX_VALUE_BYTES`.
    pub fn new(bytes: Vec<u8>) -> Result<Self, HorizonError> {
        Self::with_limit(bytes, MAX_VALUE_BYTES)
    }

    /// Validate and wrap a byte buffer as a value, checked against a
    /// caller-supplied (tighter or equal) limit.
    pub fn with_limit(bytes: Vec<u8>, max_len: usize) -> Result<Self, HorizonError> {
        let max = max_len.min(MAX_VALUE_BYTES);
        if bytes.len() > max {
            return Err(HorizonError::ValueTooLarge {
                len: bytes.len(),
                max,
            });
        }
        Ok(Value(bytes))
    }

    /// Borrow the underlying bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the value, returning the underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if this is a zero-length value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Value {
    /// Infallible construction used internally (e.g. by the WAL replayer,
    /// where bytes were already validated before the original write).
    fn from(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_empty_value() {
        assert!(Value::new(vec![]).unwrap().is_empty());
    }

    #[test]
    fn accepts_max_length_value() {
        let bytes = vec![0u8; MAX_VALUE_BYTES];
        assert!(Value::new(bytes).is_ok());
    }

    #[test]
    fn rejects_one_byte_over_max() {
        let bytes = vec![0u8; MAX_VALUE_BYTES + 1];
        assert!(matches!(
            Value::new(bytes),
            Err(HorizonError::ValueTooLarge { .. })
        ));
    }
}
