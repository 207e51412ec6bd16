//! chainseal: audit-integrity chain command line.
//!
//! Usage:
//!   chainseal keygen --out keys/audit.pem
//!   chainseal demo --config chainseal.toml --export chain.json
//!   chainseal verify chain.json --config auditor.toml

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chainseal_audit::{IntegrityManager, ManagerConfig};
use chainseal_contracts::{
    error::{ChainsealError, ChainsealResult},
    record::{AuditRecord, Details},
    report::IntegrityVerificationResult,
};
use chainseal_crypto::signer::{Ed25519Signer, RecordSigner};

// ── CLI definition ────────────────────────────────────────────────────────────

/// chainseal: tamper-evident audit records.
#[derive(Parser)]
#[command(
    name = "chainseal",
    about = "Hash-chained, signed audit records",
    long_about = "Generates signing keys, demonstrates audit chain creation and tamper\n\
                  detection, and verifies exported audit chains."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate an Ed25519 key pair (PKCS#8 PEM plus `<out>.pub`).
    Keygen {
        /// Where to write the private key.
        #[arg(long)]
        out: PathBuf,
    },
    /// Create a LOGIN/UPDATE/DELETE chain, tamper with it, and report.
    Demo {
        /// Manager configuration (TOML).  Unsigned when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the untampered chain as an export document.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Import an export document and verify records and proof.
    Verify {
        /// The export document.
        path: PathBuf,
        /// Manager configuration (TOML) naming the verification key.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-record output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Keygen { out } => run_keygen(&out).map(|()| true),
        Command::Demo { config, export } => {
            run_demo(config.as_deref(), export.as_deref()).map(|()| true)
        }
        Command::Verify { path, config } => run_verify(&path, config.as_deref()),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("chainseal error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_manager(config: Option<&Path>) -> ChainsealResult<IntegrityManager> {
    let config = match config {
        Some(path) => ManagerConfig::from_file(path)?,
        None => ManagerConfig::default(),
    };
    Ok(IntegrityManager::from_config(&config))
}

fn write_file(path: &Path, contents: &str) -> ChainsealResult<()> {
    std::fs::write(path, contents).map_err(|e| ChainsealError::Io {
        reason: format!("failed to write '{}': {}", path.display(), e),
    })
}

/// Write `contents` to a file only the owner can read (0600 on Unix).
fn write_private_file(path: &Path, contents: &str) -> ChainsealResult<()> {
    let io_err = |e: std::io::Error| ChainsealError::Io {
        reason: format!("failed to write '{}': {}", path.display(), e),
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(io_err)?;

    // `mode` only applies on creation; tighten an existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(io_err)?;
    }
    file.write_all(contents.as_bytes()).map_err(io_err)
}

// ── keygen ────────────────────────────────────────────────────────────────────

fn run_keygen(out: &Path) -> ChainsealResult<()> {
    let signer = Ed25519Signer::generate();
    let mut pub_path = out.as_os_str().to_owned();
    pub_path.push(".pub");
    let pub_path = PathBuf::from(pub_path);

    write_private_file(out, &signer.private_key_pem()?)?;
    write_file(&pub_path, &signer.public_key_pem()?)?;

    info!(private = %out.display(), public = %pub_path.display(), "key pair written");
    println!("private key: {}", out.display());
    println!("public key:  {}", pub_path.display());
    println!("fingerprint: {}", signer.fingerprint().unwrap_or_default());
    Ok(())
}

// ── demo ──────────────────────────────────────────────────────────────────────

fn details(value: serde_json::Value) -> Details {
    value.as_object().cloned().unwrap_or_default()
}

fn run_demo(config: Option<&Path>, export: Option<&Path>) -> ChainsealResult<()> {
    let manager = load_manager(config)?;

    println!();
    println!("chainseal audit chain demo");
    println!("==========================");
    println!(
        "signing: {}   key fingerprint: {}",
        if manager.signing_enabled() { "enabled" } else { "disabled" },
        manager.key_fingerprint().unwrap_or_else(|| "-".to_string())
    );
    println!();

    let mut records = vec![
        manager.create_audit_record(
            "LOGIN",
            Some(1),
            "session",
            "login",
            details(json!({ "terminal": "front-desk" })),
        ),
        manager.create_audit_record(
            "UPDATE",
            Some(1),
            "inventory/4711",
            "adjust_stock",
            details(json!({ "qty": 12 })),
        ),
        manager.create_audit_record(
            "DELETE",
            Some(2),
            "hardware/88",
            "remove",
            details(json!({ "reason": "discontinued" })),
        ),
    ];
    for record in &records {
        print_record(record);
    }

    if let Some(path) = export {
        let document = manager.export_chain(&records)?;
        write_file(path, &document.to_json()?)?;
        println!();
        println!("exported {} records to {}", records.len(), path.display());
    }

    println!();
    let (status, _) = manager.verify_record_integrity(&records[1]);
    println!("verify UPDATE record:            {status}");

    records[1].details = details(json!({ "tampered": true }));
    let (status, issues) = manager.verify_record_integrity(&records[1]);
    println!("verify UPDATE after tampering:   {status}");
    for issue in &issues {
        println!("  - {issue}");
    }

    println!();
    print_report(&manager.export_integrity_report(&records));
    Ok(())
}

fn print_record(record: &AuditRecord) {
    println!(
        "{:<7} id={} sealed={} signed={}",
        record.event_type,
        record.id,
        record.integrity_sealed,
        record.signature.is_some()
    );
    println!("        previous={}", record.previous_hash.as_deref().unwrap_or("<genesis>"));
    println!("        chain   ={}", record.chain_hash);
}

fn print_report(report: &IntegrityVerificationResult) {
    println!("integrity report");
    println!("  records:            {}", report.record_count);
    println!("  valid:              {}", report.is_valid);
    println!("  chain integrity:    {}", report.chain_integrity);
    println!("  signature validity: {}", report.signature_validity);
    for issue in &report.issues {
        println!(
            "  [{}] #{} {} {}",
            issue.status, issue.record_index, issue.record_id, issue.issue
        );
    }
}

// ── verify ────────────────────────────────────────────────────────────────────

fn run_verify(path: &Path, config: Option<&Path>) -> ChainsealResult<bool> {
    let manager = load_manager(config)?;
    let json = std::fs::read_to_string(path).map_err(|e| ChainsealError::Io {
        reason: format!("failed to read '{}': {}", path.display(), e),
    })?;

    let imported = manager.import_chain(&json)?;
    print_report(&imported.report);
    println!("  proof valid:        {}", imported.proof_valid);
    for issue in &imported.proof_issues {
        println!("  [PROOF] {issue}");
    }

    Ok(imported.is_trustworthy())
}
