// src/consts.rs
//! Shared constants: key sizes, storage slots and migration defaults

/// Master key length in bytes (AES-256)
pub const KEY_LENGTH: usize = 32;

/// AES-GCM IV length in bytes (96-bit)
pub const IV_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LENGTH: usize = 16;

/// Durable key records are valid for one year unless configured otherwise
pub const DEFAULT_KEY_TTL_HOURS: u32 = 8760;

/// Prefix of the durable record id: `key_<uid>`
pub const KEY_ID_PREFIX: &str = "key_";

/// Session-cache slot holding the base64 master key
pub const SESSION_KEY_SLOT: &str = "_ek";

/// Session-cache slot holding the uid the cached key belongs to
pub const SESSION_UID_SLOT: &str = "_ek_uid";

/// PBKDF2 rounds used by the deprecated password-derived key path
pub const LEGACY_PBKDF2_ITERATIONS: u32 = 100_000;

/// Journal collection defaults
pub const JOURNAL_COLLECTION: &str = "journalEntries";
pub const JOURNAL_BATCH_SIZE: usize = 50;
pub const JOURNAL_FIELDS: &[&str] = &["title", "content", "learnings", "challenges", "nextSteps"];

/// Bug report collection defaults
pub const BUG_REPORT_COLLECTION: &str = "bugReports";
pub const BUG_REPORT_BATCH_SIZE: usize = 100;
pub const BUG_REPORT_FIELDS: &[&str] = &[
    "title",
    "description",
    "stepsToReproduce",
    "impact",
    "proofOfConcept",
    "target",
];

/// Profile collection that receives the migration-completed flag
pub const PROFILE_COLLECTION: &str = "users";

/// Document field names the engine reads and writes
pub const UID_FIELD: &str = "uid";
pub const ENCRYPTED_FIELD: &str = "encrypted";
pub const ENCRYPTED_AT_FIELD: &str = "encryptedAt";
pub const ENCRYPTION_ENABLED_FIELD: &str = "encryptionEnabled";
pub const MIGRATION_COMPLETED_AT_FIELD: &str = "migrationCompletedAt";
