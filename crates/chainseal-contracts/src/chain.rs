//! Running summary of an integrity manager's chain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of the chain built by one integrity manager instance.
///
/// Updated on every successful record creation and never reset; a fresh
/// chain requires a fresh manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityChainInfo {
    /// `chain_hash` of the first record this manager created.
    pub genesis_hash: Option<String>,

    /// `chain_hash` of the most recently created record.
    pub last_hash: Option<String>,

    /// Number of sealed records created so far.
    pub chain_length: u64,

    /// When the manager (and therefore the chain) was created.
    pub creation_timestamp: DateTime<Utc>,

    /// When the last record was appended.  Equals `creation_timestamp` until
    /// the first record exists.
    pub last_update_timestamp: DateTime<Utc>,

    /// 16-hex-character identifier of the signing key (or fallback secret).
    pub key_fingerprint: Option<String>,
}

impl IntegrityChainInfo {
    /// An empty chain created at `now`.
    pub fn empty(now: DateTime<Utc>, key_fingerprint: Option<String>) -> Self {
        Self {
            genesis_hash: None,
            last_hash: None,
            chain_length: 0,
            creation_timestamp: now,
            last_update_timestamp: now,
            key_fingerprint,
        }
    }
}
