//! Capability contracts for wire-object decoding and encoding.
//!
//! The runtime core consumes resources only through these two contracts:
//! `decode(raw) -> Result<T, DecodeError>` and `encode(&T) -> raw`. The
//! [`FieldReader`] helper accumulates missing/invalid field faults so a
//! malformed payload reports everything wrong with it in one error.

use serde_json::Value;

use crate::errors::{DecodeError, FieldFault};

/// Decode a resource from its raw wire object.
pub trait DecodeResource: Sized {
    /// Wire name of the resource kind, used in decode errors.
    const RESOURCE: &'static str;

    /// Decode the full wire object. Fails with an accumulated
    /// [`DecodeError`] rather than on the first fault.
    fn decode(raw: &Value) -> Result<Self, DecodeError>;
}

/// Encode a resource back into its raw wire object.
pub trait EncodeResource {
    /// Produce the wire representation.
    fn encode(&self) -> Value;
}

/// Field-by-field reader over a raw wire object.
///
/// Getters return `None` on absence or type mismatch and record the fault;
/// [`FieldReader::finish`] turns the accumulated faults into a
/// [`DecodeError`] if any were recorded.
#[derive(Debug)]
pub struct FieldReader<'a> {
    value: &'a Value,
    error: DecodeError,
}

impl<'a> FieldReader<'a> {
    /// Start reading `raw` as a `resource` object.
    ///
    /// Fails immediately if `raw` is not a JSON object — there are no
    /// fields to accumulate faults over.
    pub fn new(resource: &'static str, raw: &'a Value) -> Result<Self, DecodeError> {
        if raw.is_object() {
            Ok(Self {
                value: raw,
                error: DecodeError::new(resource),
            })
        } else {
            Err(DecodeError::not_an_object(resource))
        }
    }

    fn record_missing(&mut self, field: &str) {
        self.error.missing.push(field.to_owned());
    }

    fn record_invalid(&mut self, field: &str, reason: &str) {
        self.error.invalid.push(FieldFault {
            field: field.to_owned(),
            reason: reason.to_owned(),
        });
    }

    /// Required string field.
    pub fn required_str(&mut self, field: &str) -> Option<String> {
        match self.value.get(field) {
            None | Some(Value::Null) => {
                self.record_missing(field);
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.record_invalid(field, "expected a string");
                None
            }
        }
    }

    /// Optional string field; explicit `null` reads as absent.
    pub fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.record_invalid(field, "expected a string");
                None
            }
        }
    }

    /// Required unsigned integer field.
    pub fn required_u64(&mut self, field: &str) -> Option<u64> {
        match self.value.get(field) {
            None | Some(Value::Null) => {
                self.record_missing(field);
                None
            }
            Some(v) => v.as_u64().or_else(|| {
                self.record_invalid(field, "expected an unsigned integer");
                None
            }),
        }
    }

    /// Optional unsigned integer field.
    pub fn optional_u64(&mut self, field: &str) -> Option<u64> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => v.as_u64().or_else(|| {
                self.record_invalid(field, "expected an unsigned integer");
                None
            }),
        }
    }

    /// Optional signed integer field.
    pub fn optional_i64(&mut self, field: &str) -> Option<i64> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => v.as_i64().or_else(|| {
                self.record_invalid(field, "expected an integer");
                None
            }),
        }
    }

    /// Optional boolean field.
    pub fn optional_bool(&mut self, field: &str) -> Option<bool> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(v) => v.as_bool().or_else(|| {
                self.record_invalid(field, "expected a boolean");
                None
            }),
        }
    }

    /// Optional array field, returned as a slice view.
    pub fn optional_array(&mut self, field: &str) -> Option<&'a [Value]> {
        match self.value.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items),
            Some(_) => {
                self.record_invalid(field, "expected an array");
                None
            }
        }
    }

    /// Required nested object field.
    pub fn required_object(&mut self, field: &str) -> Option<&'a Value> {
        match self.value.get(field) {
            None | Some(Value::Null) => {
                self.record_missing(field);
                None
            }
            Some(v) if v.is_object() => Some(v),
            Some(_) => {
                self.record_invalid(field, "expected an object");
                None
            }
        }
    }

    /// Succeed if no faults were recorded, otherwise return them all.
    pub fn finish(self) -> Result<(), DecodeError> {
        if self.error.has_faults() {
            Err(self.error)
        } else {
            Ok(())
        }
    }
}
