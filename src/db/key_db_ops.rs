//! Durable key record operations
//!
//! One row per uid. `insert_key_record_if_absent` is the only creation path
//! that is safe under concurrent first use: it runs inside an IMMEDIATE
//! transaction so the second writer reads back the first writer's key.

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::consts::KEY_ID_PREFIX;
use crate::key_ops::MasterKey;
use crate::util::expiration_from;

/// Durable record of a user's master key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub id: String,
    pub uid: String,
    /// Base64 master key
    pub key: String,
    /// Epoch milliseconds
    pub expiration_time: i64,
    pub created_at: i64,
}

impl KeyRecord {
    pub fn new(uid: &str, key: &MasterKey, ttl_hours: u32, now: i64) -> Self {
        Self {
            id: key_record_id(uid),
            uid: uid.to_owned(),
            key: key.to_base64(),
            expiration_time: expiration_from(now, ttl_hours),
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expiration_time <= now
    }
}

pub fn key_record_id(uid: &str) -> String {
    format!("{KEY_ID_PREFIX}{uid}")
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<KeyRecord> {
    Ok(KeyRecord {
        id: row.get(0)?,
        uid: row.get(1)?,
        key: row.get(2)?,
        expiration_time: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Write a record, replacing whatever the uid had before
pub fn upsert_key_record(conn: &Connection, record: &KeyRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO encryption_keys (id, uid, key, expiration_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &record.id,
            &record.uid,
            &record.key,
            record.expiration_time,
            record.created_at
        ],
    )?;
    Ok(())
}

pub fn fetch_key_record(conn: &Connection, uid: &str) -> rusqlite::Result<Option<KeyRecord>> {
    conn.query_row(
        "SELECT id, uid, key, expiration_time, created_at FROM encryption_keys WHERE uid = ?1",
        [uid],
        row_to_record,
    )
    .optional()
}

pub fn delete_key_record(conn: &Connection, uid: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM encryption_keys WHERE uid = ?1", [uid])
}

/// Delete the uid's record only if it is still expired at `now`
///
/// A record replaced by a concurrent creator since it was read is kept.
pub fn delete_expired_key_record(conn: &Connection, uid: &str, now: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM encryption_keys WHERE uid = ?1 AND expiration_time <= ?2",
        params![uid, now],
    )
}

/// Compare-and-set creation: returns the record that holds the uid afterwards
pub fn insert_key_record_if_absent(
    conn: &mut Connection,
    record: &KeyRecord,
    now: i64,
) -> rusqlite::Result<KeyRecord> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    delete_expired_key_record(&tx, &record.uid, now)?;
    tx.execute(
        "INSERT OR IGNORE INTO encryption_keys (id, uid, key, expiration_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            &record.id,
            &record.uid,
            &record.key,
            record.expiration_time,
            record.created_at
        ],
    )?;
    let winner = tx.query_row(
        "SELECT id, uid, key, expiration_time, created_at FROM encryption_keys WHERE uid = ?1",
        [&record.uid],
        row_to_record,
    )?;

    tx.commit()?;
    Ok(winner)
}
