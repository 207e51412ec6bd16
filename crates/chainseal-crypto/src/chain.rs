//! Chain Linker: binding each record to its predecessor.
//!
//! Hash input layout (UTF-8): `content_hash ":" previous`, where `previous`
//! is the predecessor's `chain_hash` or `GENESIS_SENTINEL` for the first
//! record.  The result depends on nothing else, so any verifier holding the
//! record sequence can recompute it.

use chainseal_contracts::record::AuditRecord;

use crate::hash::sha256_hex;

/// Stands in for the predecessor's chain hash of the first record.
pub const GENESIS_SENTINEL: &str = "genesis";

/// Separates the two inputs of the chain hash.
pub const CHAIN_SEPARATOR: char = ':';

/// Compute the chain hash for a record.
///
/// Returns a lowercase 64-character hex string.
pub fn chain_hash(content_hash: &str, previous_hash: Option<&str>) -> String {
    let previous = previous_hash.unwrap_or(GENESIS_SENTINEL);
    let mut input = String::with_capacity(content_hash.len() + previous.len() + 1);
    input.push_str(content_hash);
    input.push(CHAIN_SEPARATOR);
    input.push_str(previous);
    sha256_hex(input.as_bytes())
}

/// Recompute `record.chain_hash` from its own `content_hash` and
/// `previous_hash`.
pub fn expected_chain_hash(record: &AuditRecord) -> String {
    chain_hash(&record.content_hash, record.previous_hash.as_deref())
}

/// True when `record` names `predecessor` as its previous link.
pub fn links_to(record: &AuditRecord, predecessor: &AuditRecord) -> bool {
    record.previous_hash.as_deref() == Some(predecessor.chain_hash.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_uses_sentinel() {
        let content = "a".repeat(64);
        assert_eq!(
            chain_hash(&content, None),
            sha256_hex(format!("{content}:genesis").as_bytes())
        );
    }

    #[test]
    fn chain_hash_depends_on_both_inputs() {
        let c1 = "1".repeat(64);
        let c2 = "2".repeat(64);
        let p = "f".repeat(64);

        assert_ne!(chain_hash(&c1, Some(&p)), chain_hash(&c2, Some(&p)));
        assert_ne!(chain_hash(&c1, Some(&p)), chain_hash(&c1, None));
        assert_eq!(chain_hash(&c1, Some(&p)), chain_hash(&c1, Some(&p)));
    }

    #[test]
    fn literal_genesis_previous_equals_absent_previous() {
        // The sentinel is only a hashing input; it is never stored on records,
        // which keep `previous_hash = None` for the first entry.
        let c = "0".repeat(64);
        assert_eq!(chain_hash(&c, None), chain_hash(&c, Some(GENESIS_SENTINEL)));
    }
}
