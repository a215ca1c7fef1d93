// src/store/sqlite.rs
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;

use super::{merge_fields, Document, DocumentStore, Filter};
use crate::consts::UID_FIELD;
use crate::crypto::Fields;
use crate::db::document_db_conn::{open_document_db, open_document_db_in_memory};
use crate::error::Result;

/// JSON documents in one SQLite table, keyed by (collection, id)
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_document_db(db_path)?),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(open_document_db_in_memory()?),
        })
    }

    /// Replace (not merge) a document
    pub fn insert(&self, collection: &str, document: &Document) -> Result<()> {
        let conn = self.conn.lock();
        write_document(&conn, collection, &document.id, &document.fields)
    }
}

fn owner_of(fields: &Fields) -> &str {
    fields.get(UID_FIELD).and_then(Value::as_str).unwrap_or("")
}

fn write_document(conn: &Connection, collection: &str, id: &str, fields: &Fields) -> Result<()> {
    let body = serde_json::to_string(fields)?;
    conn.execute(
        "INSERT OR REPLACE INTO documents (collection, id, uid, body) VALUES (?1, ?2, ?3, ?4)",
        params![collection, id, owner_of(fields), body],
    )?;
    Ok(())
}

fn read_fields(conn: &Connection, collection: &str, id: &str) -> Result<Option<Fields>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;

    match body {
        Some(body) => Ok(Some(serde_json::from_str(&body)?)),
        None => Ok(None),
    }
}

fn merge_in_tx(tx: &Transaction<'_>, collection: &str, id: &str, changes: &Fields) -> Result<()> {
    let mut fields = read_fields(tx, collection, id)?.unwrap_or_default();
    merge_fields(&mut fields, changes);
    write_document(tx, collection, id, &fields)
}

impl DocumentStore for SqliteDocumentStore {
    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let conn = self.conn.lock();
        // json_type is 'true' only for a JSON boolean true, NULL when missing
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents
             WHERE collection = ?1 AND uid = ?2
               AND (?3 = 0 OR json_type(body, '$.encrypted') IS NOT 'true')
             ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![collection, &filter.uid, filter.exclude_encrypted],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
        )?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, body) = row?;
            documents.push(Document::new(id, serde_json::from_str(&body)?));
        }
        Ok(documents)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let conn = self.conn.lock();
        Ok(read_fields(&conn, collection, id)?.map(|fields| Document::new(id, fields)))
    }

    fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        merge_in_tx(&tx, collection, id, &fields)?;
        tx.commit()?;
        Ok(())
    }

    fn commit_batch(&self, collection: &str, batch: &[Document]) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for document in batch {
            merge_in_tx(&tx, collection, &document.id, &document.fields)?;
        }
        tx.commit()?;
        Ok(())
    }
}
