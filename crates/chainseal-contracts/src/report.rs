//! Verification statuses and aggregate integrity reports.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The outcome of verifying one record.
///
/// This is a pure function of the record's content and the verifier's key;
/// it is never stored on the record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityStatus {
    /// Every check passed.
    Valid,
    /// The logical payload no longer matches `content_hash`.
    Corrupted,
    /// The record carries no integrity seal.
    Missing,
    /// A signature is present but does not verify.
    InvalidSignature,
    /// `chain_hash` does not follow from `content_hash` and `previous_hash`,
    /// or the record does not link to its predecessor.
    BrokenChain,
}

impl IntegrityStatus {
    /// True for every failure that undermines the hash chain itself.
    pub fn is_chain_related(self) -> bool {
        matches!(self, Self::Corrupted | Self::Missing | Self::BrokenChain)
    }
}

impl fmt::Display for IntegrityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "VALID",
            Self::Corrupted => "CORRUPTED",
            Self::Missing => "MISSING",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::BrokenChain => "BROKEN_CHAIN",
        };
        f.write_str(s)
    }
}

/// One problem found while verifying a sequence of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIssue {
    /// Id of the offending record.
    pub record_id: String,
    /// Position of the record in the list that was verified.
    pub record_index: usize,
    /// The record's own timestamp.
    pub timestamp: DateTime<Utc>,
    /// The status that produced this issue.
    pub status: IntegrityStatus,
    /// Human-readable description.
    pub issue: String,
}

/// Aggregate result of verifying an ordered list of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityVerificationResult {
    /// True only if the chain and all signatures are intact and no issue
    /// was raised.
    pub is_valid: bool,
    /// Number of records examined.
    pub record_count: usize,
    /// False if any record failed for a chain-related reason.
    pub chain_integrity: bool,
    /// False if any record carried an invalid signature.
    pub signature_validity: bool,
    /// Timestamp of the first record in the supplied order.
    pub first_record_timestamp: Option<DateTime<Utc>>,
    /// Timestamp of the last record in the supplied order.
    pub last_record_timestamp: Option<DateTime<Utc>>,
    /// When this verification ran.
    pub verification_timestamp: DateTime<Utc>,
    /// Issues in record order.  Empty when `is_valid`.
    pub issues: Vec<RecordIssue>,
}
