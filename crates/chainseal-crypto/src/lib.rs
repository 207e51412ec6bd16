//! # chainseal-crypto
//!
//! The cryptographic building blocks of the chainseal audit-integrity chain:
//!
//! - [`hash`]: canonical serialization and SHA-256 content hashes
//! - [`chain`]: linking each record's content hash to its predecessor
//! - [`signer`]: the `RecordSigner` trait with Ed25519 and no-op backends
//!
//! None of these hold chain state; the integrity manager in
//! `chainseal-audit` composes them.

pub mod chain;
pub mod hash;
pub mod signer;

pub use chain::{chain_hash, expected_chain_hash, links_to, GENESIS_SENTINEL};
pub use hash::{canonical_json, content_hash, details_from, sha256_hex, to_canonical_json};
pub use signer::{
    key_fingerprint, secret_fingerprint, signature_payload, Ed25519Signer, NoOpSigner,
    RecordSigner,
};
