// src/bin/migrate_user.rs
//! Migrate one user's plaintext journal entries and bug reports
//!
//! Usage: migrate_user <uid> [--status]
//!
//! Paths come from the config file (`$FV_CONFIG`) or `FV_KEY_DB` /
//! `FV_DOCUMENT_DB`. `--status` only counts what is left to migrate.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use field_vault::{
    load_config, KeyCache, KeyManager, KeyStore, MigrationEngine, SessionCache,
    SqliteDocumentStore, SqliteKeyBackend,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(uid) = args.next() else {
        bail!("usage: migrate_user <uid> [--status]");
    };
    let status_only = args.any(|arg| arg == "--status");

    let config = load_config();
    info!(
        key_db = %config.paths.key_db.display(),
        document_db = %config.paths.document_db.display(),
        "opening stores"
    );

    let session = SessionCache::in_memory();
    let backend = SqliteKeyBackend::open(&config.paths.key_db)
        .context("Failed to open key database (check FV_KEY_DB)")?;
    let keys = Arc::new(
        KeyManager::new(
            KeyStore::new(backend, session.clone()),
            session,
            Arc::new(KeyCache::new()),
        )
        .with_ttl_hours(config.keys.ttl_hours),
    );
    let documents = Arc::new(
        SqliteDocumentStore::open(&config.paths.document_db)
            .context("Failed to open document database (check FV_DOCUMENT_DB)")?,
    );

    let engine = MigrationEngine::new(documents, keys.clone())
        .with_collections(config.journal_spec(), config.bug_report_spec());

    let status = engine
        .check_migration_status(&uid)
        .context("Failed to count unencrypted records")?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if status_only || !status.needs_migration {
        return Ok(());
    }

    if !keys.initialize_encryption(&uid) {
        bail!("no encryption key available for {uid}");
    }

    let summary = engine.migrate_all_user_data(&uid);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    // Clear memory and session tiers; the durable record stays
    keys.clear_encryption_key();

    if !summary.success {
        for error in summary.all_errors() {
            warn!("{error}");
        }
        bail!("migration incomplete, safe to re-run");
    }

    info!("migration complete for {uid}");
    Ok(())
}
