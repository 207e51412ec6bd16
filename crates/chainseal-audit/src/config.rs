//! TOML configuration for the integrity manager.
//!
//! ```toml
//! private_key_path = "keys/audit.pem"
//! public_key_path = "keys/audit.pem.pub"
//! secret = "fallback fingerprint seed"
//! ```
//!
//! Every field is optional.  An empty document yields an unsigned,
//! hash-chain-only manager.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chainseal_contracts::error::{ChainsealError, ChainsealResult};
use chainseal_crypto::signer::{Ed25519Signer, NoOpSigner, RecordSigner};

/// Construction parameters for an `IntegrityManager`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// PKCS#8 PEM Ed25519 private key.  Enables signing.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// SPKI PEM public key.  Used for verify-only managers when no private
    /// key is configured or it failed to load.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,

    /// Fallback secret.  Seeds the key fingerprint when no asymmetric key
    /// is available.
    #[serde(default)]
    pub secret: Option<String>,
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("private_key_path", &self.private_key_path)
            .field("public_key_path", &self.public_key_path)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ManagerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `ChainsealError::Config` if the TOML is malformed or contains
    /// unknown keys.
    pub fn from_toml_str(s: &str) -> ChainsealResult<Self> {
        toml::from_str(s).map_err(|e| ChainsealError::Config {
            reason: format!("failed to parse manager TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML.
    ///
    /// Relative key paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> ChainsealResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ChainsealError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.private_key_path = config.private_key_path.map(|p| base.join(p));
            config.public_key_path = config.public_key_path.map(|p| base.join(p));
        }
        Ok(config)
    }

    /// Pick the signer this configuration describes.
    ///
    /// Key-loading failures never fail construction: they are logged and the
    /// next option is tried, ending at the no-op signer.
    pub fn build_signer(&self) -> Box<dyn RecordSigner> {
        if let Some(path) = &self.private_key_path {
            match Ed25519Signer::from_private_key_file(path) {
                Ok(signer) => {
                    info!(
                        fingerprint = ?signer.fingerprint(),
                        "loaded private key; records will be signed"
                    );
                    return Box::new(signer);
                }
                Err(e) => warn!(error = %e, "private key unavailable; signing disabled"),
            }
        }

        if let Some(path) = &self.public_key_path {
            match Ed25519Signer::from_public_key_file(path) {
                Ok(signer) => {
                    info!(
                        fingerprint = ?signer.fingerprint(),
                        "loaded public key; signatures will be verified but not produced"
                    );
                    return Box::new(signer);
                }
                Err(e) => warn!(error = %e, "public key unavailable; signature checks disabled"),
            }
        }

        match &self.secret {
            Some(secret) => Box::new(NoOpSigner::with_secret(secret)),
            None => Box::new(NoOpSigner::new()),
        }
    }
}
