//! Chain export and import with a signed proof.
//!
//! The proof commits to a sequence of records through `chain_digest`, the
//! SHA-256 of every record's `chain_hash` joined by `\n`.  When the exporting
//! manager can sign, the proof carries a signature over
//! `(chain_digest, record_count, terminal_hash)`.
//!
//! Import never trusts the embedded report: the importing manager recomputes
//! the report and the proof from the records themselves.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use chainseal_contracts::{
    error::ChainsealResult,
    export::{ChainExport, ChainProof, ImportedChain, EXPORT_FORMAT_VERSION},
    record::AuditRecord,
};
use chainseal_crypto::hash::sha256_hex;

use crate::manager::IntegrityManager;

/// SHA-256 over the records' chain hashes, newline-joined.
pub fn chain_digest(records: &[AuditRecord]) -> String {
    let joined = records
        .iter()
        .map(|r| r.chain_hash.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    sha256_hex(joined.as_bytes())
}

/// The fields a proof signature covers.
fn proof_payload(proof: &ChainProof) -> Value {
    let mut map = Map::new();
    map.insert("chain_digest".to_string(), Value::String(proof.chain_digest.clone()));
    map.insert("record_count".to_string(), Value::from(proof.record_count));
    map.insert(
        "terminal_hash".to_string(),
        proof.terminal_hash.clone().map(Value::String).unwrap_or(Value::Null),
    );
    Value::Object(map)
}

impl IntegrityManager {
    /// Build a proof for `records`, signed when this manager can sign.
    pub fn build_proof(&self, records: &[AuditRecord]) -> ChainsealResult<ChainProof> {
        let mut proof = ChainProof {
            record_count: records.len(),
            first_chain_hash: records.first().map(|r| r.chain_hash.clone()),
            terminal_hash: records.last().map(|r| r.chain_hash.clone()),
            chain_digest: chain_digest(records),
            key_fingerprint: self.key_fingerprint(),
            signature: None,
        };
        proof.signature = self.signer().sign_canonical(&proof_payload(&proof))?;
        Ok(proof)
    }

    /// Check `proof` against `records`, returning every mismatch found.
    pub fn verify_proof(&self, proof: &ChainProof, records: &[AuditRecord]) -> Vec<String> {
        let mut issues = Vec::new();

        if proof.record_count != records.len() {
            issues.push(format!(
                "proof covers {} records but {} were supplied",
                proof.record_count,
                records.len()
            ));
        }
        let first = records.first().map(|r| r.chain_hash.clone());
        if proof.first_chain_hash != first {
            issues.push("first chain hash does not match the proof".to_string());
        }
        let terminal = records.last().map(|r| r.chain_hash.clone());
        if proof.terminal_hash != terminal {
            issues.push("terminal hash does not match the proof".to_string());
        }
        if proof.chain_digest != chain_digest(records) {
            issues.push("chain digest does not match the supplied records".to_string());
        }

        if let Some(signature) = proof.signature.as_deref() {
            let signer = self.signer();
            if !signer.can_verify() {
                debug!("no verification key; proof signature not checked");
            } else if !signer.verify_canonical(&proof_payload(proof), signature) {
                let ours = signer.fingerprint().unwrap_or_default();
                match proof.key_fingerprint.as_deref() {
                    Some(theirs) if theirs != ours => issues.push(format!(
                        "proof was signed by key {theirs}, verifier holds key {ours}"
                    )),
                    _ => issues.push("proof signature does not verify".to_string()),
                }
            }
        }

        issues
    }

    /// Bundle `records` with a fresh report and proof.
    pub fn export_chain(&self, records: &[AuditRecord]) -> ChainsealResult<ChainExport> {
        let report = self.export_integrity_report(records);
        let proof = self.build_proof(records)?;

        info!(
            record_count = records.len(),
            is_valid = report.is_valid,
            signed = proof.signature.is_some(),
            "audit chain exported"
        );

        Ok(ChainExport {
            format_version: EXPORT_FORMAT_VERSION,
            exported_at: Utc::now(),
            chain_info: self.chain_info(),
            records: records.to_vec(),
            report,
            proof,
        })
    }

    /// Parse an export document and re-verify it with this manager's key.
    ///
    /// Fails only when the document itself is unreadable; integrity problems
    /// are reported through the returned `ImportedChain`.
    pub fn import_chain(&self, json: &str) -> ChainsealResult<ImportedChain> {
        let export = ChainExport::from_json(json)?;
        let report = self.export_integrity_report(&export.records);
        let proof_issues = self.verify_proof(&export.proof, &export.records);

        if export.report.is_valid && !report.is_valid {
            warn!(
                issue_count = report.issues.len(),
                "export claimed a valid chain but re-verification found issues"
            );
        }
        for issue in &proof_issues {
            warn!(%issue, "chain proof rejected");
        }

        info!(
            record_count = export.records.len(),
            is_valid = report.is_valid,
            proof_valid = proof_issues.is_empty(),
            "audit chain imported"
        );

        Ok(ImportedChain {
            records: export.records,
            report,
            proof_valid: proof_issues.is_empty(),
            proof_issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use chainseal_contracts::{error::ChainsealError, record::Details, report::IntegrityStatus};
    use chainseal_crypto::signer::{Ed25519Signer, NoOpSigner};

    use super::*;

    fn build_chain(manager: &IntegrityManager, n: usize) -> Vec<AuditRecord> {
        (0..n)
            .map(|i| {
                let mut details = Details::new();
                details.insert("order".to_string(), json!(format!("PO-{i:04}")));
                // Prices with a full 17 significant digits.
                let unit_price = 0.9095241838571917 + i as f64 / 7.0;
                details.insert("unit_price".to_string(), json!(unit_price));
                manager.create_audit_record(
                    "CREATE",
                    Some(5),
                    "purchasing/orders",
                    "create",
                    details,
                )
            })
            .collect()
    }

    fn key_pair() -> (Ed25519Signer, Ed25519Signer) {
        let key = Ed25519Signer::generate();
        let public = Ed25519Signer::verify_only(*key.verifying_key());
        (key, public)
    }

    #[test]
    fn signed_export_imports_cleanly_with_public_key() {
        let (key, public) = key_pair();
        let producer = IntegrityManager::with_signer(Box::new(key));
        let auditor = IntegrityManager::with_signer(Box::new(public));

        let records = build_chain(&producer, 5);
        let export = producer.export_chain(&records).unwrap();
        assert!(export.proof.signature.is_some());
        assert_eq!(export.proof.terminal_hash, records.last().map(|r| r.chain_hash.clone()));
        assert_eq!(export.chain_info.chain_length, 5);

        let imported = auditor.import_chain(&export.to_json().unwrap()).unwrap();
        assert!(imported.is_trustworthy(), "issues: {:?}", imported.proof_issues);
        assert_eq!(imported.records, records);
    }

    #[test]
    fn tampered_record_in_export_is_reported() {
        let manager = IntegrityManager::with_signer(Box::new(NoOpSigner::new()));
        let records = build_chain(&manager, 4);
        let mut export = manager.export_chain(&records).unwrap();

        export.records[2].details.insert("order".to_string(), json!("PO-9999"));
        let imported = manager.import_chain(&export.to_json().unwrap()).unwrap();

        assert!(!imported.report.is_valid);
        assert_eq!(imported.report.issues.len(), 1);
        assert_eq!(imported.report.issues[0].record_index, 2);
        assert_eq!(imported.report.issues[0].status, IntegrityStatus::Corrupted);
        // Chain hashes are untouched, so the proof still matches.
        assert!(imported.proof_valid);
    }

    #[test]
    fn truncated_export_fails_proof() {
        let manager = IntegrityManager::with_signer(Box::new(NoOpSigner::new()));
        let records = build_chain(&manager, 4);
        let mut export = manager.export_chain(&records).unwrap();

        export.records.pop();
        let imported = manager.import_chain(&export.to_json().unwrap()).unwrap();

        assert!(imported.report.is_valid, "a prefix is still a valid chain");
        assert!(!imported.proof_valid);
        assert!(imported.proof_issues.iter().any(|i| i.contains("proof covers 4 records")));
        assert!(!imported.is_trustworthy());
    }

    #[test]
    fn forged_proof_signature_is_rejected() {
        let (key, public) = key_pair();
        let producer = IntegrityManager::with_signer(Box::new(key));
        let auditor = IntegrityManager::with_signer(Box::new(public));

        let records = build_chain(&producer, 3);
        let mut export = producer.export_chain(&records).unwrap();
        let other = IntegrityManager::with_signer(Box::new(Ed25519Signer::generate()));
        export.proof.signature = other.build_proof(&records).unwrap().signature;

        let imported = auditor.import_chain(&export.to_json().unwrap()).unwrap();
        assert!(!imported.proof_valid);
        assert_eq!(imported.proof_issues, vec!["proof signature does not verify".to_string()]);
    }

    #[test]
    fn proof_from_other_key_names_both_fingerprints() {
        let producer = IntegrityManager::with_signer(Box::new(Ed25519Signer::generate()));
        let auditor = IntegrityManager::with_signer(Box::new(Ed25519Signer::generate()));

        let records = build_chain(&producer, 2);
        let proof = producer.build_proof(&records).unwrap();
        let issues = auditor.verify_proof(&proof, &records);

        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains(&producer.key_fingerprint().unwrap()));
        assert!(issues[0].contains(&auditor.key_fingerprint().unwrap()));
    }

    #[test]
    fn empty_chain_exports() {
        let manager = IntegrityManager::with_signer(Box::new(NoOpSigner::new()));
        let proof = manager.build_proof(&[]).unwrap();
        assert_eq!(proof.record_count, 0);
        assert_eq!(proof.terminal_hash, None);
        assert!(manager.verify_proof(&proof, &[]).is_empty());
    }

    #[test]
    fn chain_digest_depends_on_order() {
        let manager = IntegrityManager::with_signer(Box::new(NoOpSigner::new()));
        let mut records = build_chain(&manager, 3);
        let digest = chain_digest(&records);
        records.swap(0, 2);
        assert_ne!(chain_digest(&records), digest);
    }

    #[test]
    fn garbage_input_is_import_error() {
        let manager = IntegrityManager::with_signer(Box::new(NoOpSigner::new()));
        let err = manager.import_chain("[]").unwrap_err();
        assert!(matches!(err, ChainsealError::Import { .. }));
    }
}
