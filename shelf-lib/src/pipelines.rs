//! Running independent reconciliation pipelines concurrently.
//!
//! Each pipeline reads one source's data and reconciles it on its own
//! blocking task with its own [`RunContext`]; pipelines share nothing. Their
//! outcomes are forwarded over one channel to a single consumer callback, so
//! the caller's sink sees every pipeline's outcomes in that pipeline's order
//! without locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shelf_core::{
    Outcome, RecordBatch, ReconcilePolicy, RunContext, SourceKind, SourceRole,
};
use shelf_reconcile::{ReconcileStats, reconcile};
use shelf_snapshot::{batch_from_file, find_snapshot, load_snapshot};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::async_util::run_with_events;

/// Where a pipeline's records come from.
#[derive(Debug)]
pub enum PipelineInput {
    /// A directory holding `installed.*` and `owned.*` snapshots, plus
    /// optional `hidden.*` and `relationships.*` annotation snapshots.
    SnapshotDir(PathBuf),
    /// A launcher library database.
    Database { path: PathBuf, origin: SourceKind },
    /// Batches the caller already read.
    Batches {
        installed: RecordBatch,
        owned: RecordBatch,
    },
}

/// One independent reconciliation run.
#[derive(Debug)]
pub struct Pipeline {
    pub name: String,
    pub input: PipelineInput,
}

impl Pipeline {
    pub fn snapshot_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        Self {
            name,
            input: PipelineInput::SnapshotDir(dir),
        }
    }

    pub fn database(path: impl Into<PathBuf>, origin: SourceKind) -> Self {
        Self {
            name: origin.short_name().to_string(),
            input: PipelineInput::Database {
                path: path.into(),
                origin,
            },
        }
    }

    pub fn batches(name: impl Into<String>, installed: RecordBatch, owned: RecordBatch) -> Self {
        Self {
            name: name.into(),
            input: PipelineInput::Batches { installed, owned },
        }
    }
}

impl PipelineInput {
    /// Read both sides. Unreadable inputs become source errors in the batches.
    pub fn load(self, policy: &ReconcilePolicy, ctx: &mut RunContext) -> (RecordBatch, RecordBatch) {
        match self {
            Self::SnapshotDir(dir) => load_snapshot_dir_pair(&dir, ctx),
            Self::Database { path, origin } => shelf_db::read_library(&path, origin, policy, ctx),
            Self::Batches { installed, owned } => (installed, owned),
        }
    }
}

/// Which source a snapshot directory describes: its name if that is a known
/// source, otherwise the first snapshot in it that can be read.
fn snapshot_dir_origin(dir: &Path) -> SourceKind {
    let from_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse::<SourceKind>().ok());
    if let Some(origin) = from_name {
        return origin;
    }
    ["installed", "owned"]
        .iter()
        .filter_map(|stem| find_snapshot(dir, stem))
        .find_map(|path| load_snapshot(&path).ok())
        .map(|snapshot| snapshot.source)
        .unwrap_or(SourceKind::Local)
}

fn load_snapshot_dir_pair(dir: &Path, ctx: &mut RunContext) -> (RecordBatch, RecordBatch) {
    let origin = snapshot_dir_origin(dir);
    let side = |stem: &str, role: SourceRole, ctx: &mut RunContext| {
        // A missing file surfaces as an unreadable source, not an empty one.
        let path = find_snapshot(dir, stem).unwrap_or_else(|| dir.join(format!("{stem}.yaml")));
        batch_from_file(&path, origin, role, ctx)
    };

    let installed = side("installed", SourceRole::Installed, ctx);
    let mut owned = side("owned", SourceRole::Owned, ctx);

    for (stem, role) in [
        ("hidden", SourceRole::HiddenFlag),
        ("relationships", SourceRole::RelationshipHint),
    ] {
        if let Some(path) = find_snapshot(dir, stem) {
            let mut annotations = batch_from_file(&path, origin, role, ctx);
            owned.records.append(&mut annotations.records);
            owned.errors.append(&mut annotations.errors);
        }
    }
    (installed, owned)
}

#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

fn is_pipeline_dir(dir: &Path) -> bool {
    find_snapshot(dir, "installed").is_some() || find_snapshot(dir, "owned").is_some()
}

/// Find snapshot pipelines under `root`, one per subdirectory holding an
/// `installed` or `owned` snapshot, sorted by directory name. A `root` that
/// holds snapshots itself is a single pipeline.
pub fn discover_pipelines(root: &Path) -> Result<Vec<Pipeline>, DiscoverError> {
    if !root.is_dir() {
        return Err(DiscoverError::NotADirectory(root.display().to_string()));
    }
    if is_pipeline_dir(root) {
        return Ok(vec![Pipeline::snapshot_dir(root)]);
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| DiscoverError::Io {
            path: root.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir() && is_pipeline_dir(p))
        .collect();
    dirs.sort();

    log::debug!("Found {} pipelines under {}", dirs.len(), root.display());
    Ok(dirs.into_iter().map(Pipeline::snapshot_dir).collect())
}

/// Something that happened in one pipeline, tagged with its position in the
/// list passed to [`run_pipelines`].
#[derive(Debug)]
pub enum PipelineEvent {
    Started { pipeline: usize, name: String },
    Outcome { pipeline: usize, outcome: Outcome },
    Finished { pipeline: usize, entities: usize, errors: usize },
}

/// How one pipeline ended.
#[derive(Debug)]
pub struct PipelineReport {
    pub name: String,
    /// Run counters, absent when reconciliation could not start.
    pub stats: Option<ReconcileStats>,
    /// Entities and errors forwarded to the sink.
    pub entities: usize,
    pub errors: usize,
    /// Why the run could not start or did not finish.
    pub failure: Option<String>,
    pub cancelled: bool,
}

impl PipelineReport {
    fn new(name: String) -> Self {
        Self {
            name,
            stats: None,
            entities: 0,
            errors: 0,
            failure: None,
            cancelled: false,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && !self.cancelled
    }
}

fn run_one(
    index: usize,
    pipeline: Pipeline,
    policy: &ReconcilePolicy,
    cancel: &AtomicBool,
    tx: &mpsc::UnboundedSender<PipelineEvent>,
) -> PipelineReport {
    let mut report = PipelineReport::new(pipeline.name.clone());
    // A send only fails once the consumer is gone; the run finishes regardless.
    let _ = tx.send(PipelineEvent::Started {
        pipeline: index,
        name: pipeline.name,
    });

    let mut ctx = RunContext::new();
    let (installed, owned) = pipeline.input.load(policy, &mut ctx);

    let mut stream = match reconcile(installed, owned, policy) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("{}: {}", report.name, e);
            report.failure = Some(e.to_string());
            return report;
        }
    };

    for outcome in stream.by_ref() {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("{}: cancelled", report.name);
            report.cancelled = true;
            break;
        }
        if outcome.is_entity() {
            report.entities += 1;
        } else {
            report.errors += 1;
        }
        let _ = tx.send(PipelineEvent::Outcome {
            pipeline: index,
            outcome,
        });
    }
    report.stats = Some(stream.stats());

    let _ = tx.send(PipelineEvent::Finished {
        pipeline: index,
        entities: report.entities,
        errors: report.errors,
    });
    report
}

/// Run every pipeline concurrently and feed their events to `on_event`.
///
/// Returns one report per pipeline, in input order. Setting `cancel` stops
/// each pipeline at its next outcome.
pub async fn run_pipelines(
    pipelines: Vec<Pipeline>,
    policy: &ReconcilePolicy,
    cancel: Arc<AtomicBool>,
    on_event: impl FnMut(PipelineEvent),
) -> Vec<PipelineReport> {
    let (tx, rx) = mpsc::unbounded_channel();
    let names: Vec<String> = pipelines.iter().map(|p| p.name.clone()).collect();

    let handles: Vec<_> = pipelines
        .into_iter()
        .enumerate()
        .map(|(index, pipeline)| {
            let tx = tx.clone();
            let policy = policy.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || run_one(index, pipeline, &policy, &cancel, &tx))
        })
        .collect();
    // Only the pipelines hold senders now, so the channel closes when they finish.
    drop(tx);

    let results = run_with_events(futures::future::join_all(handles), rx, on_event).await;

    results
        .into_iter()
        .zip(names)
        .map(|(result, name)| match result {
            Ok(report) => report,
            Err(e) => {
                log::warn!("{}: pipeline task failed: {}", name, e);
                let mut report = PipelineReport::new(name);
                report.failure = Some(e.to_string());
                report
            }
        })
        .collect()
}
