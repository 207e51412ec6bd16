//! Portable chain export documents.
//!
//! A `ChainExport` bundles records with the report they produced at export
//! time and a `ChainProof` that commits to the whole sequence.  Importers
//! re-verify everything; nothing in the document is trusted as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chain::IntegrityChainInfo,
    error::{ChainsealError, ChainsealResult},
    record::AuditRecord,
    report::IntegrityVerificationResult,
};

/// The only export format version this crate reads and writes.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// A compact commitment to an exported sequence of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProof {
    /// Number of records covered.
    pub record_count: usize,
    /// `chain_hash` of the first covered record.
    pub first_chain_hash: Option<String>,
    /// `chain_hash` of the last covered record.
    pub terminal_hash: Option<String>,
    /// SHA-256 (hex) over every covered `chain_hash`, newline-joined.
    pub chain_digest: String,
    /// Fingerprint of the key that signed the proof, if any.
    pub key_fingerprint: Option<String>,
    /// Base64 signature over `(chain_digest, record_count, terminal_hash)`.
    pub signature: Option<String>,
}

/// A self-contained, JSON-serializable export of an audit chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainExport {
    /// Always `EXPORT_FORMAT_VERSION` when written by this crate.
    pub format_version: u32,
    /// When the export was produced.
    pub exported_at: DateTime<Utc>,
    /// The exporting manager's chain summary at export time.
    pub chain_info: IntegrityChainInfo,
    /// The exported records, in creation order.
    pub records: Vec<AuditRecord>,
    /// The report the exporter computed over `records`.
    pub report: IntegrityVerificationResult,
    /// Commitment to `records`.
    pub proof: ChainProof,
}

impl ChainExport {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> ChainsealResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ChainsealError::Serialization {
            reason: format!("failed to serialize chain export: {e}"),
        })
    }

    /// Parse an export document, rejecting unknown format versions.
    pub fn from_json(s: &str) -> ChainsealResult<Self> {
        let export: ChainExport = serde_json::from_str(s).map_err(|e| ChainsealError::Import {
            reason: format!("malformed chain export: {e}"),
        })?;
        if export.format_version != EXPORT_FORMAT_VERSION {
            return Err(ChainsealError::Import {
                reason: format!(
                    "unsupported export format version {} (expected {})",
                    export.format_version, EXPORT_FORMAT_VERSION
                ),
            });
        }
        Ok(export)
    }
}

/// The outcome of importing a `ChainExport`.
#[derive(Debug, Clone)]
pub struct ImportedChain {
    /// The records as found in the document.
    pub records: Vec<AuditRecord>,
    /// A fresh report computed by the importing manager.
    pub report: IntegrityVerificationResult,
    /// True when the proof matches the records (and its signature, if
    /// checkable, verifies).
    pub proof_valid: bool,
    /// Reasons the proof was rejected.  Empty when `proof_valid`.
    pub proof_issues: Vec<String>,
}

impl ImportedChain {
    /// True when both the records and the proof check out.
    pub fn is_trustworthy(&self) -> bool {
        self.report.is_valid && self.proof_valid
    }
}
