//! The lazy, single-pass result of one reconciliation run.

use std::vec;

use shelf_core::{CanonicalEntity, Outcome, ReconcileError};

use crate::policy::PolicyFilter;

/// Counters describing one run. Exclusions are counted as the stream is consumed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Canonical entities built, before policy filtering.
    pub entities: usize,
    pub merged_primary: usize,
    pub merged_secondary: usize,
    pub owned_only: usize,
    pub installed_only: usize,
    /// Ingestion, merge, and resolver errors. Exclusions are counted separately.
    pub errors: usize,
    pub duplicates: usize,
    pub conflicts: usize,
    pub dependents: usize,
    pub dangling: usize,
    pub cycles: usize,
    pub excluded: usize,
}

/// Ordered outcomes of a run: errors first, then entities in merge order with
/// policy exclusions in place of the entities they replace.
///
/// Single pass; reconcile again to start over.
pub struct OutcomeStream {
    errors: vec::IntoIter<ReconcileError>,
    entities: PolicyFilter<vec::IntoIter<CanonicalEntity>>,
    stats: ReconcileStats,
}

impl OutcomeStream {
    pub(crate) fn new(
        errors: Vec<ReconcileError>,
        entities: PolicyFilter<vec::IntoIter<CanonicalEntity>>,
        stats: ReconcileStats,
    ) -> Self {
        Self {
            errors: errors.into_iter(),
            entities,
            stats,
        }
    }

    /// Snapshot of the run's counters.
    pub fn stats(&self) -> ReconcileStats {
        ReconcileStats {
            excluded: self.entities.excluded(),
            ..self.stats.clone()
        }
    }
}

impl Iterator for OutcomeStream {
    type Item = Outcome;

    fn next(&mut self) -> Option<Outcome> {
        if let Some(error) = self.errors.next() {
            return Some(Outcome::Error(error));
        }
        self.entities.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let errors = self.errors.len();
        let (low, high) = self.entities.size_hint();
        (errors + low, high.map(|h| h + errors))
    }
}

impl std::fmt::Debug for OutcomeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeStream")
            .field("pending_errors", &self.errors.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
