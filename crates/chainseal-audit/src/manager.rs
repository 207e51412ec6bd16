//! The integrity manager: the only component callers touch.
//!
//! `IntegrityManager` composes the hash engine, the chain linker, and a
//! `RecordSigner`.  It owns the running chain state behind a `Mutex`; the
//! whole read-link-sign-advance sequence of record creation happens under
//! that lock so concurrent callers always extend one linear chain.
//!
//! The manager never stores records.  Callers persist what
//! `create_audit_record` returns and hand sequences back for verification.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chainseal_contracts::{
    chain::IntegrityChainInfo,
    error::{ChainsealError, ChainsealResult},
    record::{AuditRecord, Details},
    report::{IntegrityStatus, IntegrityVerificationResult, RecordIssue},
};
use chainseal_crypto::{
    chain::{chain_hash, expected_chain_hash, links_to},
    hash::content_hash,
    signer::{signature_payload, RecordSigner},
};

use crate::config::ManagerConfig;

/// Build a record id: `<unix-millis>-<8 hex chars>`.
///
/// The suffix is the first 32 bits of a v4 UUID.  Two ids collide only if
/// both land in the same millisecond with the same suffix; that chance is
/// accepted rather than guaranteed away.
pub fn generate_record_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}

/// Orchestrates sealing and verification of audit records.
///
/// # Thread safety
///
/// All methods take `&self`.  Share one manager per chain (e.g. in an
/// `Arc`) rather than one per thread; separate managers build separate
/// chains.
pub struct IntegrityManager {
    signer: Box<dyn RecordSigner>,
    state: Mutex<IntegrityChainInfo>,
}

impl IntegrityManager {
    /// Build a manager from an optional private key file and fallback secret.
    ///
    /// A key that cannot be loaded is logged and the manager runs unsigned.
    pub fn new(private_key_path: Option<&Path>, secret: Option<&str>) -> Self {
        Self::from_config(&ManagerConfig {
            private_key_path: private_key_path.map(Path::to_path_buf),
            public_key_path: None,
            secret: secret.map(str::to_string),
        })
    }

    /// Build a manager from a loaded configuration.
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::with_signer(config.build_signer())
    }

    /// Build a manager around an explicit signer.
    pub fn with_signer(signer: Box<dyn RecordSigner>) -> Self {
        let info = IntegrityChainInfo::empty(Utc::now(), signer.fingerprint());
        info!(
            fingerprint = ?info.key_fingerprint,
            signing = signer.can_sign(),
            "integrity manager initialized"
        );
        Self {
            signer,
            state: Mutex::new(info),
        }
    }

    /// Snapshot of the running chain summary.
    pub fn chain_info(&self) -> IntegrityChainInfo {
        // The state is only written after every fallible step succeeded, so a
        // poisoned lock still guards a consistent value.
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fingerprint of the key (or secret) this manager tags chains with.
    pub fn key_fingerprint(&self) -> Option<String> {
        self.signer.fingerprint()
    }

    /// Whether new records receive signatures.
    pub fn signing_enabled(&self) -> bool {
        self.signer.can_sign()
    }

    pub(crate) fn signer(&self) -> &dyn RecordSigner {
        self.signer.as_ref()
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    /// Create and seal a new audit record, appending it to the chain.
    ///
    /// Never fails.  If sealing goes wrong the failure is logged and the
    /// record comes back with `integrity_sealed == false` and empty integrity
    /// fields, so the audited business operation can continue.  Callers must
    /// check `integrity_sealed` before trusting a record.
    pub fn create_audit_record(
        &self,
        event_type: &str,
        user_id: Option<i64>,
        resource: &str,
        action: &str,
        details: Details,
    ) -> AuditRecord {
        let mut record = Self::unsealed_record(event_type, user_id, resource, action, details);
        if let Err(e) = self.seal(&mut record) {
            error!(
                record_id = %record.id,
                event_type = %record.event_type,
                error = %e,
                "failed to seal audit record; returning unsealed record"
            );
            record.content_hash.clear();
            record.previous_hash = None;
            record.chain_hash.clear();
            record.signature = None;
            record.integrity_sealed = false;
        }
        record
    }

    /// Like `create_audit_record`, but propagates sealing failures.
    ///
    /// On error the chain state is left untouched.
    pub fn try_create_audit_record(
        &self,
        event_type: &str,
        user_id: Option<i64>,
        resource: &str,
        action: &str,
        details: Details,
    ) -> ChainsealResult<AuditRecord> {
        let mut record = Self::unsealed_record(event_type, user_id, resource, action, details);
        self.seal(&mut record)?;
        Ok(record)
    }

    fn unsealed_record(
        event_type: &str,
        user_id: Option<i64>,
        resource: &str,
        action: &str,
        details: Details,
    ) -> AuditRecord {
        let now = Utc::now();
        AuditRecord {
            id: generate_record_id(now),
            timestamp: now,
            event_type: event_type.to_string(),
            user_id,
            resource: resource.to_string(),
            action: action.to_string(),
            details,
            content_hash: String::new(),
            previous_hash: None,
            chain_hash: String::new(),
            signature: None,
            integrity_sealed: false,
        }
    }

    /// Hash, link, and sign `record`, then advance the chain.
    fn seal(&self, record: &mut AuditRecord) -> ChainsealResult<()> {
        let mut state = self.state.lock().map_err(|e| ChainsealError::StatePoisoned {
            reason: format!("chain state lock poisoned: {}", e),
        })?;

        record.previous_hash = state.last_hash.clone();
        record.content_hash = content_hash(record)?;
        record.chain_hash = chain_hash(&record.content_hash, record.previous_hash.as_deref());
        record.signature = self.signer.sign_record(record)?;
        record.integrity_sealed = true;

        if state.genesis_hash.is_none() {
            state.genesis_hash = Some(record.chain_hash.clone());
        }
        state.last_hash = Some(record.chain_hash.clone());
        state.chain_length += 1;
        state.last_update_timestamp = Utc::now();

        debug!(
            record_id = %record.id,
            event_type = %record.event_type,
            chain_length = state.chain_length,
            chain_hash = %record.chain_hash,
            signed = record.signature.is_some(),
            "audit record sealed"
        );

        Ok(())
    }

    // ── Verification ──────────────────────────────────────────────────────────

    /// Verify one record against itself.
    ///
    /// Checks run in a fixed order and stop at the first failure:
    /// seal present, content hash, chain hash, signature.  A record with
    /// several defects reports only the first.  Linkage to neighbouring
    /// records is checked by `export_integrity_report`, not here.
    ///
    /// A signature is only checked when present and this manager holds a
    /// verification key; otherwise it is treated as not applicable.
    pub fn verify_record_integrity(&self, record: &AuditRecord) -> (IntegrityStatus, Vec<String>) {
        let (status, issues) = self.check_record(record);
        if status != IntegrityStatus::Valid {
            warn!(
                record_id = %record.id,
                %status,
                issue = ?issues.first(),
                "record failed verification"
            );
        }
        (status, issues)
    }

    fn check_record(&self, record: &AuditRecord) -> (IntegrityStatus, Vec<String>) {
        if !record.has_integrity_fields() {
            return (
                IntegrityStatus::Missing,
                vec![format!("record {} carries no integrity seal", record.id)],
            );
        }

        match content_hash(record) {
            Ok(computed) if computed == record.content_hash => {}
            Ok(computed) => {
                return (
                    IntegrityStatus::Corrupted,
                    vec![format!(
                        "content hash mismatch: stored {}, computed {}",
                        record.content_hash, computed
                    )],
                );
            }
            Err(e) => {
                return (
                    IntegrityStatus::Corrupted,
                    vec![format!("record content cannot be re-hashed: {e}")],
                );
            }
        }

        let expected = expected_chain_hash(record);
        if expected != record.chain_hash {
            return (
                IntegrityStatus::BrokenChain,
                vec![format!(
                    "chain hash mismatch: stored {}, computed {} from previous hash {}",
                    record.chain_hash,
                    expected,
                    record.previous_hash.as_deref().unwrap_or("<genesis>")
                )],
            );
        }

        if let Some(signature) = record.signature.as_deref().filter(|s| !s.is_empty()) {
            if !self.signer.can_verify() {
                debug!(record_id = %record.id, "no verification key; signature not checked");
            } else if !self.signer.verify_canonical(&signature_payload(record), signature) {
                return (
                    IntegrityStatus::InvalidSignature,
                    vec![format!(
                        "signature does not verify against key {}",
                        self.signer.fingerprint().unwrap_or_default()
                    )],
                );
            }
        }

        (IntegrityStatus::Valid, Vec::new())
    }

    /// Verify an ordered list of records and aggregate the findings.
    ///
    /// Records are examined in the order given; nothing is re-sorted.
    /// Besides per-record checks, each record that passes on its own must
    /// also name the preceding record's `chain_hash` as its `previous_hash`.
    /// The first record's link is not checked, so a sub-range of a chain
    /// verifies cleanly.
    pub fn export_integrity_report(&self, records: &[AuditRecord]) -> IntegrityVerificationResult {
        let mut issues = Vec::new();
        let mut chain_integrity = true;
        let mut signature_validity = true;

        for (index, record) in records.iter().enumerate() {
            let (mut status, mut messages) = self.verify_record_integrity(record);

            if status == IntegrityStatus::Valid && index > 0 {
                let prev = &records[index - 1];
                if !links_to(record, prev) {
                    warn!(record_id = %record.id, index, "record does not link to its predecessor");
                    status = IntegrityStatus::BrokenChain;
                    messages = vec![format!(
                        "previous hash does not match chain hash of record {} at index {}",
                        prev.id,
                        index - 1
                    )];
                }
            }

            if status == IntegrityStatus::Valid {
                continue;
            }
            if status.is_chain_related() {
                chain_integrity = false;
            }
            if status == IntegrityStatus::InvalidSignature {
                signature_validity = false;
            }
            issues.extend(messages.into_iter().map(|issue| RecordIssue {
                record_id: record.id.clone(),
                record_index: index,
                timestamp: record.timestamp,
                status,
                issue,
            }));
        }

        let result = IntegrityVerificationResult {
            is_valid: chain_integrity && signature_validity && issues.is_empty(),
            record_count: records.len(),
            chain_integrity,
            signature_validity,
            first_record_timestamp: records.first().map(|r| r.timestamp),
            last_record_timestamp: records.last().map(|r| r.timestamp),
            verification_timestamp: Utc::now(),
            issues,
        };

        info!(
            record_count = result.record_count,
            is_valid = result.is_valid,
            issue_count = result.issues.len(),
            "integrity report generated"
        );

        result
    }
}
