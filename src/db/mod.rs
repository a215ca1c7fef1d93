// src/db/mod.rs
//! SQLite connections and raw row operations
pub mod document_db_conn;
pub mod key_db_conn;
pub mod key_db_ops;
