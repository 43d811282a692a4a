use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use shelf_core::{RecordBatch, RunContext, SourceKind, SourceRole};
use shelf_reconcile::reconcile_with_progress;
use shelf_snapshot::{batch_from_file, load_snapshot};

use super::{effective_policy, log_stats, outcome_json, outcome_line};
use crate::CliError;
use crate::cli_types::PolicyArgs;
use crate::spinner::SpinnerProgress;

/// Where the reconcile command reads its records from.
pub(crate) struct ReconcileInputs {
    pub installed: Option<PathBuf>,
    pub owned: Option<PathBuf>,
    pub hidden: Option<PathBuf>,
    pub relationships: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub source: Option<SourceKind>,
}

/// The source a pair of snapshots describes, read from whichever loads first.
fn snapshot_source(paths: &[&Path]) -> Option<SourceKind> {
    paths
        .iter()
        .find_map(|path| load_snapshot(path).ok())
        .map(|snapshot| snapshot.source)
}

fn read_snapshots(
    inputs: &ReconcileInputs,
    installed: &Path,
    owned: &Path,
    ctx: &mut RunContext,
) -> Result<(RecordBatch, RecordBatch), CliError> {
    let origin = match inputs.source {
        Some(origin) => origin,
        None => snapshot_source(&[installed, owned]).ok_or_else(|| {
            CliError::usage("Neither snapshot could be read to determine its source; pass --source")
        })?,
    };

    let installed = batch_from_file(installed, origin, SourceRole::Installed, ctx);
    let mut owned = batch_from_file(owned, origin, SourceRole::Owned, ctx);
    let annotations = [
        (&inputs.hidden, SourceRole::HiddenFlag),
        (&inputs.relationships, SourceRole::RelationshipHint),
    ];
    for (path, role) in annotations {
        if let Some(path) = path {
            let mut batch = batch_from_file(path, origin, role, ctx);
            owned.records.append(&mut batch.records);
            owned.errors.append(&mut batch.errors);
        }
    }
    Ok((installed, owned))
}

pub(crate) fn run_reconcile(
    inputs: ReconcileInputs,
    policy_args: &PolicyArgs,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let policy = effective_policy(policy_args)?;
    let mut ctx = RunContext::new();

    let (installed, owned) = match (&inputs.db, &inputs.installed, &inputs.owned) {
        (Some(db), _, _) => {
            let origin = inputs.source.unwrap_or(SourceKind::Gog);
            if !json {
                log::info!(
                    "Reading {} library: {}",
                    origin.display_name(),
                    db.display().if_supports_color(Stdout, |t| t.cyan()),
                );
            }
            shelf_db::read_library(db, origin, &policy, &mut ctx)
        }
        (None, Some(installed), Some(owned)) => read_snapshots(&inputs, installed, owned, &mut ctx)?,
        _ => {
            return Err(CliError::usage(
                "Pass either --db or both --installed and --owned",
            ));
        }
    };

    let progress = SpinnerProgress::new(quiet || json);
    let mut stream = reconcile_with_progress(installed, owned, &policy, Some(&progress))?;
    drop(progress);

    for outcome in stream.by_ref() {
        if json {
            println!("{}", outcome_json(&outcome, None)?);
        } else {
            log::info!("{}", outcome_line(&outcome));
        }
    }

    if !json {
        crate::log_blank();
        log::info!("{}", "Summary".if_supports_color(Stdout, |t| t.bold()));
        log_stats(&stream.stats());
    }
    Ok(())
}
