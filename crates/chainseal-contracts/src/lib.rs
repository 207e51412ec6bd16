//! # chainseal-contracts
//!
//! Shared types for the chainseal audit-integrity chain.
//!
//! Every other crate in the workspace imports from here.  No hashing,
//! signing, or verification logic lives in this crate, only data definitions
//! and the error type.

pub mod chain;
pub mod error;
pub mod export;
pub mod record;
pub mod report;

pub use chain::IntegrityChainInfo;
pub use error::{ChainsealError, ChainsealResult};
pub use export::{ChainExport, ChainProof, ImportedChain, EXPORT_FORMAT_VERSION};
pub use record::{AuditRecord, Details};
pub use report::{IntegrityStatus, IntegrityVerificationResult, RecordIssue};
