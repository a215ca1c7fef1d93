// src/migration.rs
//! Resumable plaintext → ciphertext migration
//!
//! Per collection: Scanning → Batching → Encrypting → Committing →
//! Done | PartiallyFailed. Each batch commits atomically; a failed batch is
//! recorded and the run moves on. Only records not yet marked `encrypted`
//! are scanned, so re-running is always safe.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collection::CollectionSpec;
use crate::consts::{
    ENCRYPTED_AT_FIELD, ENCRYPTED_FIELD, ENCRYPTION_ENABLED_FIELD, MIGRATION_COMPLETED_AT_FIELD,
    PROFILE_COLLECTION,
};
use crate::crypto::{encrypt_fields, populated_fields, Fields};
use crate::enums::MigrationPhase;
use crate::error::{CoreError, Result};
use crate::key_manager::KeyManager;
use crate::key_ops::MasterKey;
use crate::store::{Document, DocumentStore, Filter};
use crate::util::now_rfc3339;

/// Aggregate report of one collection run; reflects partial progress
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    /// Records found by the scan
    pub total_processed: usize,
    /// Committed records with at least one sealed field
    pub total_encrypted: usize,
    pub errors: Vec<String>,
    pub batches: usize,
    pub phase: MigrationPhase,
}

impl MigrationResult {
    fn started() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn record_error(&mut self, error: impl ToString) {
        self.success = false;
        self.errors.push(error.to_string());
    }

    fn finish(mut self) -> Self {
        self.phase = if self.success {
            MigrationPhase::Done
        } else {
            MigrationPhase::PartiallyFailed
        };
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub success: bool,
    pub journal: MigrationResult,
    pub bug_reports: MigrationResult,
    /// Errors outside either collection run (run guard, profile flag)
    pub errors: Vec<String>,
}

impl MigrationSummary {
    pub fn all_errors(&self) -> impl Iterator<Item = &str> {
        self.journal
            .errors
            .iter()
            .chain(&self.bug_reports.errors)
            .chain(&self.errors)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub journal_unencrypted: usize,
    pub bug_reports_unencrypted: usize,
    pub needs_migration: bool,
}

/// Removes the uid from the running set when the run ends
struct RunGuard<'a> {
    running: &'a Mutex<HashSet<String>>,
    uid: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.lock().remove(&self.uid);
    }
}

pub struct MigrationEngine {
    store: Arc<dyn DocumentStore>,
    keys: Arc<KeyManager>,
    journal: CollectionSpec,
    bug_reports: CollectionSpec,
    running: Mutex<HashSet<String>>,
}

impl MigrationEngine {
    pub fn new(store: Arc<dyn DocumentStore>, keys: Arc<KeyManager>) -> Self {
        Self {
            store,
            keys,
            journal: CollectionSpec::journal(),
            bug_reports: CollectionSpec::bug_reports(),
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_collections(mut self, journal: CollectionSpec, bug_reports: CollectionSpec) -> Self {
        self.journal = journal;
        self.bug_reports = bug_reports;
        self
    }

    pub fn journal_spec(&self) -> &CollectionSpec {
        &self.journal
    }

    pub fn bug_report_spec(&self) -> &CollectionSpec {
        &self.bug_reports
    }

    fn begin_run(&self, uid: &str) -> Result<RunGuard<'_>> {
        if !self.running.lock().insert(uid.to_owned()) {
            return Err(CoreError::MigrationInProgress(uid.to_owned()));
        }
        Ok(RunGuard {
            running: &self.running,
            uid: uid.to_owned(),
        })
    }

    /// Active key if `uid` is signed in, else the durable one
    ///
    /// Never touches the memory or session tiers, so migrating another uid
    /// leaves the signed-in user's key in place.
    fn resolve_key(&self, uid: &str) -> Result<MasterKey> {
        if let Some(key) = self.keys.active_key(uid) {
            return Ok(key);
        }
        self.keys.get_user_master_key(uid).map_err(|e| {
            warn!(uid, error = %e, "no master key for migration");
            CoreError::KeyUnavailable
        })
    }

    pub fn migrate_collection(&self, uid: &str, spec: &CollectionSpec) -> MigrationResult {
        match self.begin_run(uid) {
            Ok(_guard) => self.run_collection(uid, spec),
            Err(e) => {
                let mut result = MigrationResult::started();
                result.record_error(e);
                result.finish()
            }
        }
    }

    pub fn migrate_journal_entries(&self, uid: &str) -> MigrationResult {
        self.migrate_collection(uid, &self.journal)
    }

    pub fn migrate_bug_reports(&self, uid: &str) -> MigrationResult {
        self.migrate_collection(uid, &self.bug_reports)
    }

    fn run_collection(&self, uid: &str, spec: &CollectionSpec) -> MigrationResult {
        let mut result = MigrationResult::started();

        let key = match self.resolve_key(uid) {
            Ok(key) => key,
            Err(e) => {
                warn!(uid, collection = %spec.name, error = %e, "migration skipped, no key");
                result.record_error(e);
                return result.finish();
            }
        };

        debug!(uid, collection = %spec.name, phase = ?MigrationPhase::Scanning);
        let pending = match self.store.query(&spec.name, &Filter::unencrypted(uid)) {
            Ok(documents) => documents,
            Err(e) => {
                result.record_error(format!("{}: scan failed: {e}", spec.name));
                return result.finish();
            }
        };
        result.total_processed = pending.len();

        let batch_size = spec.batch_size.max(1);
        debug!(
            uid,
            collection = %spec.name,
            phase = ?MigrationPhase::Batching,
            records = pending.len(),
            batch_size
        );

        let encrypted_at = now_rfc3339();
        for (index, chunk) in pending.chunks(batch_size).enumerate() {
            let batch_number = index + 1;
            result.batches += 1;

            debug!(collection = %spec.name, batch = batch_number, phase = ?MigrationPhase::Encrypting);
            let mut batch = Vec::with_capacity(chunk.len());
            let mut sealed_in_batch = 0;
            for document in chunk {
                match seal_document(document, spec, &key, &encrypted_at) {
                    Ok((sealed, had_fields)) => {
                        if had_fields {
                            sealed_in_batch += 1;
                        }
                        batch.push(sealed);
                    }
                    Err(e) => result.record_error(format!("{}/{}: {e}", spec.name, document.id)),
                }
            }
            if batch.is_empty() {
                continue;
            }

            debug!(collection = %spec.name, batch = batch_number, phase = ?MigrationPhase::Committing);
            match self.store.commit_batch(&spec.name, &batch) {
                Ok(()) => result.total_encrypted += sealed_in_batch,
                Err(e) => {
                    let failure = CoreError::MigrationBatchFailure {
                        collection: spec.name.clone(),
                        batch: batch_number,
                        reason: e.to_string(),
                    };
                    warn!(uid, error = %failure, "batch commit failed, continuing");
                    result.record_error(failure);
                }
            }
        }

        let result = result.finish();
        info!(
            uid,
            collection = %spec.name,
            processed = result.total_processed,
            encrypted = result.total_encrypted,
            batches = result.batches,
            phase = ?result.phase,
            "migration finished"
        );
        result
    }

    /// Journal then bug reports; flags the profile only if both succeed
    pub fn migrate_all_user_data(&self, uid: &str) -> MigrationSummary {
        let _guard = match self.begin_run(uid) {
            Ok(guard) => guard,
            Err(e) => {
                return MigrationSummary {
                    errors: vec![e.to_string()],
                    ..MigrationSummary::default()
                }
            }
        };

        let journal = self.run_collection(uid, &self.journal);
        let bug_reports = self.run_collection(uid, &self.bug_reports);
        let mut summary = MigrationSummary {
            success: journal.success && bug_reports.success,
            journal,
            bug_reports,
            errors: Vec::new(),
        };

        if summary.success {
            let mut flag = Fields::new();
            flag.insert(ENCRYPTION_ENABLED_FIELD.to_owned(), Value::Bool(true));
            flag.insert(
                MIGRATION_COMPLETED_AT_FIELD.to_owned(),
                Value::String(now_rfc3339()),
            );
            if let Err(e) = self.store.update(PROFILE_COLLECTION, uid, flag) {
                warn!(uid, error = %e, "failed to flag profile after migration");
                summary.success = false;
                summary.errors.push(format!("profile flag: {e}"));
            }
        }

        summary
    }

    /// Read-only count of records still waiting for migration
    pub fn check_migration_status(&self, uid: &str) -> Result<MigrationStatus> {
        let filter = Filter::unencrypted(uid);
        let journal_unencrypted = self.store.count(&self.journal.name, &filter)?;
        let bug_reports_unencrypted = self.store.count(&self.bug_reports.name, &filter)?;

        Ok(MigrationStatus {
            journal_unencrypted,
            bug_reports_unencrypted,
            needs_migration: journal_unencrypted + bug_reports_unencrypted > 0,
        })
    }
}

/// Seal the populated configured fields and mark the record encrypted
///
/// The flag reports whether any field was actually sealed.
fn seal_document(
    document: &Document,
    spec: &CollectionSpec,
    key: &MasterKey,
    encrypted_at: &str,
) -> Result<(Document, bool)> {
    let present = populated_fields(&document.fields, spec.fields.as_slice());
    let mut fields = encrypt_fields(&document.fields, &present[..], key)?;
    fields.insert(ENCRYPTED_FIELD.to_owned(), Value::Bool(true));
    fields.insert(
        ENCRYPTED_AT_FIELD.to_owned(),
        Value::String(encrypted_at.to_owned()),
    );
    Ok((Document::new(document.id.clone(), fields), !present.is_empty()))
}
