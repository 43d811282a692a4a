//! Snapshot documents: source records captured as YAML or JSON.
//!
//! Snapshots let a host feed the reconciliation engine from files exported by
//! other tools, and give tests a readable way to describe source data.

pub mod load;
pub mod types;

pub use load::{
    SnapshotError, batch_from_file, find_snapshot, load_snapshot, load_snapshot_dir,
    parse_snapshot,
};
pub use types::{
    Snapshot, SnapshotAux, SnapshotFold, SnapshotJoin, SnapshotRow, SnapshotTable,
    SnapshotTables,
};
