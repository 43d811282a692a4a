//! The `reconcile` entry point: merge, resolve relationships, filter.

use shelf_core::{RecordBatch, ReconcilePolicy, SourceKind};
use thiserror::Error;

use crate::merge::merge_records;
use crate::policy::filter;
use crate::progress::ReconcileProgress;
use crate::relationship::resolve_relationships;
use crate::stream::{OutcomeStream, ReconcileStats};

/// A precondition failure that prevents the whole run.
///
/// Everything that concerns individual records or sources is reported on the
/// [`OutcomeStream`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot reconcile {installed} installations against the {owned} catalog")]
    SourceMismatch {
        installed: SourceKind,
        owned: SourceKind,
    },
}

/// Reconcile one source's installed records against its owned records.
pub fn reconcile(
    installed: RecordBatch,
    owned: RecordBatch,
    policy: &ReconcilePolicy,
) -> Result<OutcomeStream, PipelineError> {
    reconcile_with_progress(installed, owned, policy, None)
}

/// [`reconcile`] with progress callbacks for each phase and each entity built.
pub fn reconcile_with_progress(
    installed: RecordBatch,
    owned: RecordBatch,
    policy: &ReconcilePolicy,
    progress: Option<&dyn ReconcileProgress>,
) -> Result<OutcomeStream, PipelineError> {
    if installed.origin != owned.origin {
        return Err(PipelineError::SourceMismatch {
            installed: installed.origin,
            owned: owned.origin,
        });
    }
    let origin = installed.origin;

    let mut errors = installed.errors;
    errors.extend(owned.errors);

    if let Some(p) = progress {
        p.on_phase(&format!(
            "Merging {} installed and {} owned {} records",
            installed.records.len(),
            owned.records.len(),
            origin.short_name()
        ));
    }
    let records = installed.records.into_iter().chain(owned.records);
    let mut merged = merge_records(records, progress);
    errors.append(&mut merged.errors);

    if let Some(p) = progress {
        p.on_phase("Resolving DLC relationships");
    }
    let (resolver_errors, resolved) = resolve_relationships(&mut merged.entities);
    errors.extend(resolver_errors);

    let stats = ReconcileStats {
        entities: merged.entities.len(),
        merged_primary: merged.stats.merged_primary,
        merged_secondary: merged.stats.merged_secondary,
        owned_only: merged.stats.owned_only,
        installed_only: merged.stats.installed_only,
        errors: errors.len(),
        duplicates: merged.stats.duplicates,
        conflicts: merged.stats.conflicts,
        dependents: resolved.dependents,
        dangling: resolved.dangling,
        cycles: resolved.cycles,
        excluded: 0,
    };
    if let Some(p) = progress {
        p.on_complete(&stats);
    }

    Ok(OutcomeStream::new(
        errors,
        filter(merged.entities, policy),
        stats,
    ))
}
