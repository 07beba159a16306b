//! Common test utilities for the scenario suite.

use horizon::{Key, Value};

/// Build a `Key` from a plain string, panicking on construction errors
/// since every key used in these scenarios is well within limits.
pub fn key(s: &str) -> Key {
    Key::try_from(s).unwrap()
}

/// Build a `Value` from a plain string.
pub fn value(s: &str) -> Value {
    Value::new(s.as_bytes().to_vec()).unwrap()
}
