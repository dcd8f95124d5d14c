//! Decoding OTLP `AnyValue`/`KeyValue` attribute lists into plain Rust values.

use opentelemetry_proto::tonic::common::v1::{any_value::Value as OtlpValue, AnyValue, KeyValue};
use serde::Serialize;
use std::collections::HashMap;

/// A span attribute value, stripped of its OTLP wrapper.
///
/// Only the four primitive shapes survive decoding; arrays, maps and byte
/// strings have no representation an attribute key can flatten into, so
/// [`decode_any_value`] maps them to `None` instead of inventing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Converts to a `serde_json::Value`, for fields typed `mapping<string, any>`
    /// in the data model (`ToolCall.arguments`, `ToolResponse.response`, ...).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::String(s) => serde_json::Value::String(s.clone()),
            AttrValue::Int(n) => serde_json::Value::from(*n),
            AttrValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{s}"),
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Double(d) => write!(f, "{d}"),
            AttrValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Decodes a single OTLP `AnyValue` into a plain [`AttrValue`].
///
/// Returns `None` for an empty oneof and for array/map/bytes values, both
/// logged at debug level per spec — this layer never fails loudly, it just
/// narrows what later stages have to handle.
pub fn decode_any_value(value: &AnyValue) -> Option<AttrValue> {
    match &value.value {
        Some(OtlpValue::StringValue(s)) => Some(AttrValue::String(s.clone())),
        Some(OtlpValue::IntValue(i)) => Some(AttrValue::Int(*i)),
        Some(OtlpValue::DoubleValue(d)) => Some(AttrValue::Double(*d)),
        Some(OtlpValue::BoolValue(b)) => Some(AttrValue::Bool(*b)),
        Some(OtlpValue::ArrayValue(_)) => {
            tracing::debug!("unsupported attribute value type: array");
            None
        }
        Some(OtlpValue::KvlistValue(_)) => {
            tracing::debug!("unsupported attribute value type: kvlist");
            None
        }
        Some(OtlpValue::BytesValue(_)) => {
            tracing::debug!("unsupported attribute value type: bytes");
            None
        }
        None => {
            tracing::debug!("empty attribute value");
            None
        }
    }
}

/// Flattens a `KeyValue` list into a `key -> AttrValue` map keyed by the
/// attribute's dotted path (e.g. `"args.agent_name"`, `"tool_response.text"`).
///
/// OTLP forbids duplicate keys within one attribute list but does not
/// enforce it on the wire; a later entry silently overwrites an earlier one
/// with the same key (last-write-wins), tolerating producers that do.
pub fn flatten_attributes(attributes: &[KeyValue]) -> HashMap<String, AttrValue> {
    let mut flat = HashMap::with_capacity(attributes.len());
    for kv in attributes {
        let Some(value) = kv.value.as_ref().and_then(decode_any_value) else {
            continue;
        };
        flat.insert(kv.key.clone(), value);
    }
    flat
}
