//! Launcher library database layout.
//!
//! Launchers own their databases; this crate only reads them. The schema here
//! mirrors the tables the reader understands so fixtures and tests can build a
//! library from scratch.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("library database not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Create all tables if they don't exist.
///
/// This is idempotent, safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Open an existing launcher database read-only.
pub fn open_library(path: &Path) -> Result<Connection, DbError> {
    if !path.is_file() {
        return Err(DbError::NotFound(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    Ok(conn)
}

/// Open or create a writable library database with the full schema.
pub fn open_database(path: &Path) -> Result<Connection, DbError> {
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Whether `table` exists. Launcher versions differ in which tables they ship.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, DbError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists)
}

const SCHEMA_SQL: &str = r#"
-- Entitlements: one row per owned release per account
CREATE TABLE IF NOT EXISTS library_releases (
    release_key TEXT NOT NULL,
    user_id TEXT NOT NULL DEFAULT 'default',
    title TEXT,
    slug TEXT
);

-- Store metadata
CREATE TABLE IF NOT EXISTS game_details (
    release_key TEXT NOT NULL,
    description TEXT,
    developer TEXT,
    publisher TEXT,
    release_date TEXT,
    cover_url TEXT,
    rating REAL,
    genre_ids TEXT
);

-- Static genre dictionary
CREATE TABLE IF NOT EXISTS genres (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_tags (
    release_key TEXT NOT NULL,
    tag TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS last_played (
    release_key TEXT NOT NULL,
    last_played_at TEXT
);

CREATE TABLE IF NOT EXISTS hidden_releases (
    release_key TEXT NOT NULL
);

-- Addon -> base game
CREATE TABLE IF NOT EXISTS dlc_links (
    release_key TEXT NOT NULL,
    parent_release_key TEXT NOT NULL
);

-- Installations on this machine
CREATE TABLE IF NOT EXISTS installed_products (
    product_id INTEGER NOT NULL,
    install_path TEXT,
    version TEXT,
    install_size INTEGER,
    slug TEXT
);

CREATE TABLE IF NOT EXISTS play_tasks (
    product_id INTEGER NOT NULL,
    executable TEXT,
    arguments TEXT,
    is_primary BOOLEAN NOT NULL DEFAULT 0
);
"#;
