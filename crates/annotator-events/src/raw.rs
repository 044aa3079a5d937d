//! Serde helpers for the loosely-typed identifiers in source payloads.
//!
//! The source APIs are inconsistent about whether identifiers are JSON
//! strings or numbers. Both are accepted and normalised to `String`.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or a number, found {other}"
        ))),
    }
}

pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Treats an explicit `null` like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads `eventType.eventDefinition.eventDefinitionId` without parsing the
/// rest of the entry.
pub fn definition_id_of(raw: &Value) -> Option<String> {
    match raw.pointer("/eventType/eventDefinition/eventDefinitionId")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
