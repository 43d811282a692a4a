//! Reconcile installed and owned records into canonical entities.
//!
//! This crate owns the engine: joining a source's tables into records, merging
//! the installed and owned sides, classifying DLC, applying the caller's
//! policy, and emitting the ordered outcome stream. Adapters produce the
//! [`RecordBatch`](shelf_core::RecordBatch)es it consumes.

pub mod joiner;
pub mod merge;
pub mod pipeline;
pub mod policy;
pub mod progress;
pub mod relationship;
pub mod stream;

pub use joiner::{AuxTable, FoldRule, JoinOn, Table, TableJoiner};
pub use merge::{MergeOutput, MergeStats, check_field, merge_fields, merge_records};
pub use pipeline::{PipelineError, reconcile, reconcile_with_progress};
pub use policy::{PolicyFilter, exclusion_reason, filter};
pub use progress::{LogProgress, ReconcileProgress, SilentProgress};
pub use relationship::{MAX_PARENT_DEPTH, ResolveStats, resolve_relationships};
pub use stream::{OutcomeStream, ReconcileStats};
