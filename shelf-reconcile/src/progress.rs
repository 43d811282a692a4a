//! Reconciliation progress reporting.

use crate::stream::ReconcileStats;

/// Trait for receiving reconciliation progress updates.
pub trait ReconcileProgress {
    /// Called when a phase starts (e.g., "Merging gog records").
    fn on_phase(&self, message: &str);

    /// Called after each canonical entity is built during the merge.
    fn on_entity(&self, current: usize, total: usize, label: &str);

    /// Called once the outcome stream is ready to be consumed.
    fn on_complete(&self, stats: &ReconcileStats);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl ReconcileProgress for SilentProgress {
    fn on_phase(&self, _message: &str) {}
    fn on_entity(&self, _current: usize, _total: usize, _label: &str) {}
    fn on_complete(&self, _stats: &ReconcileStats) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl ReconcileProgress for LogProgress {
    fn on_phase(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_entity(&self, current: usize, total: usize, label: &str) {
        if current.is_multiple_of(500) || current == total {
            log::info!("  [{}/{}] {}", current, total, label);
        }
    }

    fn on_complete(&self, stats: &ReconcileStats) {
        log::info!(
            "Reconciled {} entities ({} merged, {} owned only, {} installed only), {} errors",
            stats.entities,
            stats.merged_primary + stats.merged_secondary,
            stats.owned_only,
            stats.installed_only,
            stats.errors,
        );
    }
}
