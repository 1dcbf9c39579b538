// src/memory/mod.rs — Durable chat history

pub mod schema;
pub mod store;
pub mod store_server;

pub use store_server::{spawn_store_server, StoreHandle};

use rusqlite::Connection;
use std::path::Path;

/// Open (or create) the database at the given path and run migrations.
pub fn open_store(path: &Path) -> anyhow::Result<store::Store> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(store::Store::new(conn))
}

/// Create an in-memory database (for testing).
pub fn in_memory_store() -> anyhow::Result<store::Store> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(store::Store::new(conn))
}
