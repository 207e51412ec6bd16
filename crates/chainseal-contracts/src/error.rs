//! Error types for the chainseal audit-integrity chain.
//!
//! Only a handful of operations can fail outright.  Verification outcomes are
//! never errors: they are reported through `IntegrityStatus` instead.

use thiserror::Error;

/// The unified error type for the chainseal crates.
#[derive(Debug, Error)]
pub enum ChainsealError {
    /// A record payload (usually `details`) could not be canonically serialized.
    ///
    /// Callers should treat this as a programming error in the payload they
    /// built, not as a transient condition to retry.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// A key file was missing, unreadable, or not a valid PEM key.
    #[error("key load error: {reason}")]
    KeyLoad { reason: String },

    /// The signer failed to produce a signature.
    #[error("signing failed: {reason}")]
    Signing { reason: String },

    /// The manager's chain-state lock was poisoned by a panicking thread.
    #[error("chain state unavailable: {reason}")]
    StatePoisoned { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Reading or writing a file outside key loading failed.
    #[error("i/o error: {reason}")]
    Io { reason: String },

    /// An exported chain document could not be imported.
    #[error("chain import failed: {reason}")]
    Import { reason: String },
}

/// Convenience alias used throughout the chainseal crates.
pub type ChainsealResult<T> = Result<T, ChainsealError>;
