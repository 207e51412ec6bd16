//! Hash Engine: canonical serialization and content hashing.
//!
//! Canonical form is compact JSON with object keys sorted lexicographically
//! at every depth.  Sorting is done here explicitly rather than relying on
//! `serde_json`'s default map type, so enabling `preserve_order` anywhere in
//! the dependency graph cannot change a hash.
//!
//! The content hash covers exactly the logical payload of a record:
//! `action`, `details`, `event_type`, `resource`, `timestamp`, `user_id`.
//! Integrity fields never feed into it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use chainseal_contracts::{
    error::{ChainsealError, ChainsealResult},
    record::{AuditRecord, Details},
};

/// The logical payload of a record, borrowed for hashing.
#[derive(Serialize)]
struct ContentPayload<'a> {
    timestamp: &'a DateTime<Utc>,
    event_type: &'a str,
    user_id: Option<i64>,
    resource: &'a str,
    action: &'a str,
    details: &'a Details,
}

/// SHA-256 of `bytes` as a lowercase 64-character hex string.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Render `value` as compact JSON with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Value's Display impl escapes the key exactly as serde_json would.
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Serialize any value into its canonical JSON text.
///
/// Fails with `ChainsealError::Serialization` when `serde_json` rejects the
/// value, e.g. a map keyed by something other than strings.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> ChainsealResult<String> {
    let value = serde_json::to_value(value).map_err(|e| ChainsealError::Serialization {
        reason: e.to_string(),
    })?;
    Ok(canonical_json(&value))
}

/// Convert an arbitrary serializable payload into a `details` map.
///
/// The payload must serialize to a JSON object.
pub fn details_from<T: Serialize + ?Sized>(value: &T) -> ChainsealResult<Details> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ChainsealError::Serialization {
            reason: format!("details must serialize to a JSON object, got {}", json_kind(&other)),
        }),
        Err(e) => Err(ChainsealError::Serialization {
            reason: format!("details are not serializable: {e}"),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Compute the content hash of a record's logical payload.
///
/// Returns a lowercase 64-character hex string.  Two records with equal
/// logical fields hash identically regardless of `details` key order.
pub fn content_hash(record: &AuditRecord) -> ChainsealResult<String> {
    let payload = ContentPayload {
        timestamp: &record.timestamp,
        event_type: &record.event_type,
        user_id: record.user_id,
        resource: &record.resource,
        action: &record.action,
        details: &record.details,
    };
    let canonical = to_canonical_json(&payload)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
