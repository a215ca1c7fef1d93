// src/db/key_db_conn.rs
use std::time::Duration;
use std::{fs, path::Path};

use rusqlite::{Connection, Result};

const KEY_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS encryption_keys (
        id              TEXT PRIMARY KEY,
        uid             TEXT NOT NULL UNIQUE,
        key             TEXT NOT NULL,
        expiration_time INTEGER NOT NULL,
        created_at      INTEGER NOT NULL
    );
"#;

/// Open (or create) the durable key database at `db_path`
pub fn open_key_db<P: AsRef<Path>>(db_path: P) -> Result<Connection> {
    let db_path = db_path.as_ref();

    if let Some(parent) = db_path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let conn = Connection::open(db_path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(KEY_SCHEMA)?;
    Ok(conn)
}

pub fn open_key_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(KEY_SCHEMA)?;
    Ok(conn)
}
