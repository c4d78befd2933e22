//! Record marshaling between JSON values and native device structures.
//!
//! Records are the loosely-typed shape configuration travels in at the
//! process boundary. [`build`] renders a native graph into records;
//! [`read`] validates records field-by-field and assembles the native
//! graph, rejecting the whole record on the first violation.

pub mod build;
pub mod read;

pub use build::{allowedip_record, device_record, peer_record};
pub use read::{allowedip_from_record, device_from_record, peer_from_record};

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Interpret a value as an object, or fail naming the entity.
pub(crate) fn as_object<'a>(
    value: &'a Value,
    entity: &'static str,
) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or(Error::FieldType {
        field: entity,
        expected: "object",
    })
}

/// Require a string field.
pub(crate) fn str_field<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a str> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(Error::FieldType {
            field,
            expected: "string",
        }),
    }
}

/// Require an array field.
pub(crate) fn array_field<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Vec<Value>> {
    match obj.get(field) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(Error::FieldType {
            field,
            expected: "array",
        }),
    }
}

/// Require a non-negative integer field.
fn number_field(obj: &Map<String, Value>, field: &'static str) -> Result<u64> {
    obj.get(field)
        .and_then(Value::as_u64)
        .ok_or(Error::FieldType {
            field,
            expected: "number",
        })
}

/// Require a field holding an unsigned 32-bit integer.
pub(crate) fn u32_field(obj: &Map<String, Value>, field: &'static str) -> Result<u32> {
    u32::try_from(number_field(obj, field)?).map_err(|_| Error::FieldType {
        field,
        expected: "unsigned 32-bit integer",
    })
}

/// Require a field holding an unsigned 16-bit integer.
pub(crate) fn u16_field(obj: &Map<String, Value>, field: &'static str) -> Result<u16> {
    u16::try_from(number_field(obj, field)?).map_err(|_| Error::FieldType {
        field,
        expected: "unsigned 16-bit integer",
    })
}
