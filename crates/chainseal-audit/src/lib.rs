//! # chainseal-audit
//!
//! Tamper-evident audit records for business applications.
//!
//! ## Overview
//!
//! Every record created through an [`IntegrityManager`] gets a SHA-256
//! content hash over its logical fields, a chain hash linking it to the
//! previous record, and (when a key is configured) an Ed25519 signature.
//! Changing a single byte of a stored record is detected by
//! `verify_record_integrity`; removing or reordering records is detected by
//! `export_integrity_report`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainseal_audit::{IntegrityManager, ManagerConfig};
//!
//! let manager = IntegrityManager::from_config(&ManagerConfig::from_file(path)?);
//! let record = manager.create_audit_record("UPDATE", Some(7), "inventory/42", "adjust", details);
//! if !record.integrity_sealed {
//!     // store anyway, but flag for follow-up
//! }
//!
//! let report = manager.export_integrity_report(&stored_records);
//! assert!(report.is_valid);
//! ```

pub mod config;
pub mod export;
pub mod manager;

pub use config::ManagerConfig;
pub use export::chain_digest;
pub use manager::{generate_record_id, IntegrityManager};

// ── Tests ─────────────────────────────────────────────────────────────────────
