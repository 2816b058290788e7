// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus payloads.
//!
//! Every payload on the bus is a JSON object. The map type sorts its keys,
//! which gives `canonical_key` a deterministic text form regardless of the
//! order fields were inserted in.

use serde_json::Value;

/// A JSON-object payload.
pub type Payload = serde_json::Map<String, Value>;

/// Keys that only exist for transport bookkeeping and are stripped from
/// every outbound payload to save bus bandwidth.
pub const TRANSPORT_KEYS: [&str; 3] = ["time", "status", "topic"];

/// Remove transport-only keys in place.
pub fn strip_transport_keys(payload: &mut Payload) {
    for key in TRANSPORT_KEYS {
        payload.remove(key);
    }
}

/// The `value` field of a payload, with JSON null treated as absent.
pub fn value_of(payload: &Payload) -> Option<&Value> {
    payload.get("value").filter(|v| !v.is_null())
}

/// Truthiness the way remote nodes use it: non-zero numbers and `true`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Parse payload bytes, substituting the empty object for anything that is
/// not a JSON object. Inbound handling never fails on a bad payload.
pub fn parse_lossy(bytes: &[u8]) -> Payload {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        _ => Payload::new(),
    }
}

/// Deterministic encoding of `(topic, payload)`.
///
/// Used exclusively for step deduplication; the key-sorted map makes the
/// serialized form independent of insertion order.
pub fn canonical_key(topic: &str, payload: &Payload) -> String {
    let body = serde_json::to_string(payload).unwrap_or_default();
    format!("{topic} {body}")
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
