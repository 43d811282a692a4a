//! SQLite adapter for launcher library databases.
//!
//! Reads entitlement, metadata, and installation tables in full (via rusqlite
//! with the bundled feature) and joins them into owned and installed
//! [`RecordBatch`](shelf_core::RecordBatch)es for the reconciliation engine.

pub mod library;
pub mod schema;

pub use library::{read_installed, read_library, read_owned};
pub use schema::{DbError, create_schema, open_database, open_library, open_memory, table_exists};
