//! The audit record: one event in the integrity chain.
//!
//! An `AuditRecord` splits into two halves.  The logical payload
//! (`timestamp`, `event_type`, `user_id`, `resource`, `action`, `details`) is
//! what the business layer supplies.  The integrity fields are computed by the
//! integrity manager and are never accepted from callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form key/value payload attached to an audit event.
pub type Details = Map<String, Value>;

/// A single audit event, as stored by whatever persistence layer owns it.
///
/// The struct serializes as one flat JSON object, with `details` nested.
/// Backends that store rows can keep `details` as JSON text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier, `<unix-millis>-<8 hex chars>`.
    pub id: String,

    /// Wall-clock time (UTC) the record was created.
    pub timestamp: DateTime<Utc>,

    /// Event discriminant, e.g. `"LOGIN"` or `"UPDATE"`.
    pub event_type: String,

    /// The acting user, if the event is attributable to one.
    pub user_id: Option<i64>,

    /// The resource the event touched, e.g. `"inventory/4711"`.
    pub resource: String,

    /// The action performed on `resource`.
    pub action: String,

    /// Arbitrary event details.
    #[serde(default)]
    pub details: Details,

    /// SHA-256 (hex) of the logical payload.  Empty when unsealed.
    #[serde(default)]
    pub content_hash: String,

    /// `chain_hash` of the preceding record; `None` for the first record.
    #[serde(default)]
    pub previous_hash: Option<String>,

    /// SHA-256 (hex) linking `content_hash` to `previous_hash`.  Empty when
    /// unsealed.
    #[serde(default)]
    pub chain_hash: String,

    /// Base64 signature over the record's chain entry, when a key was used.
    #[serde(default)]
    pub signature: Option<String>,

    /// True once every integrity field above has been populated.
    #[serde(default)]
    pub integrity_sealed: bool,
}

impl AuditRecord {
    /// True when the record claims a seal and carries both hashes.
    pub fn has_integrity_fields(&self) -> bool {
        self.integrity_sealed && !self.content_hash.is_empty() && !self.chain_hash.is_empty()
    }
}
