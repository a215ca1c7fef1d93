// src/db/document_db_conn.rs
use std::time::Duration;
use std::{fs, path::Path};

use rusqlite::{Connection, Result};

const DOCUMENT_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id         TEXT NOT NULL,
        uid        TEXT NOT NULL DEFAULT '',
        body       TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, uid);
"#;

pub fn open_document_db<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(DOCUMENT_SCHEMA)?;
    Ok(conn)
}

pub fn open_document_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(DOCUMENT_SCHEMA)?;
    Ok(conn)
}
