//! Structured decode errors for the resource capability contracts.
//!
//! Malformed wire payloads are values, not exceptions: decoding returns a
//! [`DecodeError`] listing every missing and invalid field so callers can
//! log the whole fault set at once and drop the payload.

use std::fmt;

use thiserror::Error;

/// A single invalid field: name plus what was wrong with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFault {
    /// Field name as it appears on the wire.
    pub field: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl fmt::Display for FieldFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field, self.reason)
    }
}

/// Decode failure for one wire object.
///
/// Accumulates faults instead of failing on the first one.
#[derive(Clone, Debug, Error)]
pub struct DecodeError {
    /// Resource kind being decoded (e.g. `"channel"`).
    pub resource: &'static str,
    /// Required fields that were absent.
    pub missing: Vec<String>,
    /// Fields present with an unusable value.
    pub invalid: Vec<FieldFault>,
}

impl DecodeError {
    /// A decode error with no faults yet.
    #[must_use]
    pub fn new(resource: &'static str) -> Self {
        Self {
            resource,
            missing: Vec::new(),
            invalid: Vec::new(),
        }
    }

    /// Shorthand for "the payload was not a JSON object at all".
    #[must_use]
    pub fn not_an_object(resource: &'static str) -> Self {
        let mut err = Self::new(resource);
        err.invalid.push(FieldFault {
            field: "<root>".to_owned(),
            reason: "expected a JSON object".to_owned(),
        });
        err
    }

    /// Whether any fault was recorded.
    #[must_use]
    pub fn has_faults(&self) -> bool {
        !self.missing.is_empty() || !self.invalid.is_empty()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode {}", self.resource)?;
        if !self.missing.is_empty() {
            write!(f, "; missing: {}", self.missing.join(", "))?;
        }
        if !self.invalid.is_empty() {
            let faults: Vec<String> = self.invalid.iter().map(ToString::to_string).collect();
            write!(f, "; invalid: {}", faults.join(", "))?;
        }
        Ok(())
    }
}
