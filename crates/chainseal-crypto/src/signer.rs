//! Signer/Verifier: optional non-repudiation over chain entries.
//!
//! A record signature covers only `id`, `timestamp`, `content_hash`, and
//! `chain_hash`.  It proves that the holder of the key produced this chain
//! entry; the business fields are covered transitively by `content_hash`.
//!
//! The signed message is the SHA-256 digest of the canonical JSON of those
//! four fields.  Signatures travel as standard base64.
//!
//! Two implementations exist and one is picked when the integrity manager
//! is built:
//!
//! - `Ed25519Signer` holds a key pair (or only a public key, for auditors).
//! - `NoOpSigner` never signs and can carry a fingerprint derived from a
//!   fallback secret so chains can still be tagged.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::SecondsFormat;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::debug;

use chainseal_contracts::{
    error::{ChainsealError, ChainsealResult},
    record::AuditRecord,
};

use crate::hash::{canonical_json, sha256_hex};

/// Length of a key fingerprint in hex characters.
pub const FINGERPRINT_LEN: usize = 16;

/// Fingerprint of a public key: first 8 bytes of SHA-256, hex encoded.
pub fn key_fingerprint(public_key: &[u8]) -> String {
    let digest = Sha256::digest(public_key);
    hex::encode(&digest[..FINGERPRINT_LEN / 2])
}

/// Fingerprint of a fallback secret, used when no asymmetric key exists.
pub fn secret_fingerprint(secret: &str) -> String {
    let mut hex = sha256_hex(secret.as_bytes());
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// The fixed field subset a record signature covers.
pub fn signature_payload(record: &AuditRecord) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), Value::String(record.id.clone()));
    map.insert(
        "timestamp".to_string(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    );
    map.insert("content_hash".to_string(), Value::String(record.content_hash.clone()));
    map.insert("chain_hash".to_string(), Value::String(record.chain_hash.clone()));
    Value::Object(map)
}

fn digest_of(payload: &Value) -> Vec<u8> {
    Sha256::digest(canonical_json(payload).as_bytes()).to_vec()
}

/// A pluggable signing backend.
///
/// Implementations must be usable from many threads at once; key material
/// never leaves the implementation.
pub trait RecordSigner: Send + Sync {
    /// Sign a raw message.  `Ok(None)` means this signer does not sign.
    fn sign_bytes(&self, message: &[u8]) -> ChainsealResult<Option<Vec<u8>>>;

    /// Verify a raw signature.  Any malformed input yields `false`.
    fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool;

    /// Short identifier of the key in use, if any.
    fn fingerprint(&self) -> Option<String>;

    /// Whether `sign_bytes` can produce signatures.
    fn can_sign(&self) -> bool;

    /// Whether `verify_bytes` can check signatures.
    fn can_verify(&self) -> bool;

    /// Sign the canonical form of `payload`, returning base64.
    fn sign_canonical(&self, payload: &Value) -> ChainsealResult<Option<String>> {
        if !self.can_sign() {
            return Ok(None);
        }
        let digest = digest_of(payload);
        Ok(self.sign_bytes(&digest)?.map(|sig| STANDARD.encode(sig)))
    }

    /// Verify a base64 signature over the canonical form of `payload`.
    fn verify_canonical(&self, payload: &Value, signature: &str) -> bool {
        let raw = match STANDARD.decode(signature) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "signature is not valid base64");
                return false;
            }
        };
        self.verify_bytes(&digest_of(payload), &raw)
    }

    /// Sign a record's chain entry.  `Ok(None)` when signing is disabled.
    fn sign_record(&self, record: &AuditRecord) -> ChainsealResult<Option<String>> {
        self.sign_canonical(&signature_payload(record))
    }

    /// Verify the signature stored on `record`.
    ///
    /// Returns `false` when the record carries no signature; callers decide
    /// whether an absent signature matters.
    fn verify_record(&self, record: &AuditRecord) -> bool {
        match record.signature.as_deref() {
            Some(sig) => self.verify_canonical(&signature_payload(record), sig),
            None => false,
        }
    }
}

// ── Ed25519 ───────────────────────────────────────────────────────────────────

/// Ed25519 signer backed by `ed25519-dalek`.
///
/// Built from a full key pair it signs and verifies; built from a public key
/// alone it only verifies.
pub struct Ed25519Signer {
    signing_key: Option<SigningKey>,
    verifying_key: VerifyingKey,
    fingerprint: String,
}

impl Ed25519Signer {
    /// Wrap an existing signing key.
    pub fn new(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            fingerprint: key_fingerprint(verifying_key.as_bytes()),
            signing_key: Some(signing_key),
            verifying_key,
        }
    }

    /// A verification-only signer for auditors who never hold the private key.
    pub fn verify_only(verifying_key: VerifyingKey) -> Self {
        Self {
            fingerprint: key_fingerprint(verifying_key.as_bytes()),
            signing_key: None,
            verifying_key,
        }
    }

    /// Generate a fresh key pair from the operating system RNG.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Parse a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> ChainsealResult<Self> {
        let key = SigningKey::from_pkcs8_pem(pem).map_err(|e| ChainsealError::KeyLoad {
            reason: format!("invalid PKCS#8 private key: {e}"),
        })?;
        Ok(Self::new(key))
    }

    /// Parse an SPKI PEM public key.
    pub fn from_public_key_pem(pem: &str) -> ChainsealResult<Self> {
        let key = VerifyingKey::from_public_key_pem(pem).map_err(|e| ChainsealError::KeyLoad {
            reason: format!("invalid public key: {e}"),
        })?;
        Ok(Self::verify_only(key))
    }

    /// Read and parse a PEM private key file.  The file is closed before
    /// this returns.
    pub fn from_private_key_file(path: &Path) -> ChainsealResult<Self> {
        let pem = read_key_file(path)?;
        Self::from_pkcs8_pem(&pem)
    }

    /// Read and parse a PEM public key file.
    pub fn from_public_key_file(path: &Path) -> ChainsealResult<Self> {
        let pem = read_key_file(path)?;
        Self::from_public_key_pem(&pem)
    }

    /// The private key as PKCS#8 PEM, for writing to a key file.
    pub fn private_key_pem(&self) -> ChainsealResult<String> {
        let key = self.signing_key.as_ref().ok_or_else(|| ChainsealError::KeyLoad {
            reason: "signer holds no private key".to_string(),
        })?;
        let pem = key.to_pkcs8_pem(LineEnding::LF).map_err(|e| ChainsealError::KeyLoad {
            reason: format!("failed to encode private key: {e}"),
        })?;
        Ok(pem.to_string())
    }

    /// The public key as SPKI PEM.
    pub fn public_key_pem(&self) -> ChainsealResult<String> {
        self.verifying_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| ChainsealError::KeyLoad {
                reason: format!("failed to encode public key: {e}"),
            })
    }

    /// The public half of the key pair.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

fn read_key_file(path: &Path) -> ChainsealResult<String> {
    std::fs::read_to_string(path).map_err(|e| ChainsealError::KeyLoad {
        reason: format!("failed to read key file '{}': {}", path.display(), e),
    })
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("fingerprint", &self.fingerprint)
            .field("can_sign", &self.signing_key.is_some())
            .finish()
    }
}

impl RecordSigner for Ed25519Signer {
    fn sign_bytes(&self, message: &[u8]) -> ChainsealResult<Option<Vec<u8>>> {
        match &self.signing_key {
            Some(key) => {
                let sig = key.try_sign(message).map_err(|e| ChainsealError::Signing {
                    reason: e.to_string(),
                })?;
                Ok(Some(sig.to_bytes().to_vec()))
            }
            None => Ok(None),
        }
    }

    fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        let sig = match Signature::from_slice(signature) {
            Ok(sig) => sig,
            Err(e) => {
                debug!(error = %e, "malformed Ed25519 signature");
                return false;
            }
        };
        match self.verifying_key.verify_strict(message, &sig) {
            Ok(()) => true,
            Err(e) => {
                debug!(fingerprint = %self.fingerprint, error = %e, "Ed25519 verification failed");
                false
            }
        }
    }

    fn fingerprint(&self) -> Option<String> {
        Some(self.fingerprint.clone())
    }

    fn can_sign(&self) -> bool {
        self.signing_key.is_some()
    }

    fn can_verify(&self) -> bool {
        true
    }
}

// ── No-op ─────────────────────────────────────────────────────────────────────

/// Signer used when no key is configured: hash-chain-only mode.
#[derive(Debug, Clone, Default)]
pub struct NoOpSigner {
    fingerprint: Option<String>,
}

impl NoOpSigner {
    /// A no-op signer without a fingerprint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag chains with a fingerprint derived from `secret`.
    pub fn with_secret(secret: &str) -> Self {
        Self {
            fingerprint: Some(secret_fingerprint(secret)),
        }
    }
}

impl RecordSigner for NoOpSigner {
    fn sign_bytes(&self, _message: &[u8]) -> ChainsealResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn verify_bytes(&self, _message: &[u8], _signature: &[u8]) -> bool {
        false
    }

    fn fingerprint(&self) -> Option<String> {
        self.fingerprint.clone()
    }

    fn can_sign(&self) -> bool {
        false
    }

    fn can_verify(&self) -> bool {
        false
    }
}
