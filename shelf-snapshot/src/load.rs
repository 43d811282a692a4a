//! Snapshot file loading (YAML or JSON, chosen by extension).

use std::path::{Path, PathBuf};

use shelf_core::{RecordBatch, RunContext, SourceKind, SourceRole};
use thiserror::Error;

use crate::types::Snapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yml::Error,
    },
    #[error("JSON parse error in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Unsupported snapshot format: {0}")]
    UnsupportedFormat(String),
    #[error("{0}: a snapshot holds either `records` or `tables`, not both")]
    Layout(String),
    #[error("Directory not found: {0}")]
    DirNotFound(String),
}

const EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

fn has_snapshot_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.contains(&ext))
}

/// Parse a snapshot document. `path` only labels errors and picks the format.
pub fn parse_snapshot(path: &Path, contents: &str) -> Result<Snapshot, SnapshotError> {
    let label = path.display().to_string();
    let snapshot: Snapshot = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => serde_yml::from_str(contents).map_err(|e| SnapshotError::Yaml {
            path: label.clone(),
            source: e,
        })?,
        Some("json") => serde_json::from_str(contents).map_err(|e| SnapshotError::Json {
            path: label.clone(),
            source: e,
        })?,
        _ => return Err(SnapshotError::UnsupportedFormat(label)),
    };

    if snapshot.tables.is_some() && !snapshot.records.is_empty() {
        return Err(SnapshotError::Layout(label));
    }
    Ok(snapshot)
}

/// Load one snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_snapshot(path, &contents)
}

/// Load every snapshot in a directory, sorted by file name.
///
/// A missing directory holds no snapshots.
pub fn load_snapshot_dir(dir: &Path) -> Result<Vec<(PathBuf, Snapshot)>, SnapshotError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(SnapshotError::DirNotFound(dir.display().to_string()));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| SnapshotError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter(|e| has_snapshot_extension(&e.path()))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut snapshots = Vec::with_capacity(entries.len());
    for entry in entries {
        let path = entry.path();
        let snapshot = load_snapshot(&path)?;
        snapshots.push((path, snapshot));
    }
    Ok(snapshots)
}

/// Find `<stem>.yaml`, `<stem>.yml`, or `<stem>.json` in `dir`.
pub fn find_snapshot(dir: &Path, stem: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

/// Load a snapshot expected to hold `origin` records in `role`.
///
/// Anything that prevents reading the file, or a document describing a
/// different source or role, becomes a single source error in the batch.
pub fn batch_from_file(
    path: &Path,
    origin: SourceKind,
    role: SourceRole,
    ctx: &mut RunContext,
) -> RecordBatch {
    let snapshot = match load_snapshot(path) {
        Ok(snapshot) => snapshot,
        Err(SnapshotError::Io { source, .. }) => {
            return RecordBatch::failed(origin, role, path.display().to_string(), source);
        }
        Err(e) => {
            log::warn!("{}", e);
            return RecordBatch::unavailable(origin, role, e.to_string());
        }
    };

    if snapshot.source != origin || snapshot.role != role {
        return RecordBatch::unavailable(
            origin,
            role,
            format!(
                "{} holds {} {} records",
                path.display(),
                snapshot.source.short_name(),
                snapshot.role
            ),
        );
    }

    let batch = snapshot.into_batch(ctx);
    log::debug!(
        "{}: {} records, {} errors",
        path.display(),
        batch.records.len(),
        batch.errors.len()
    );
    batch
}
