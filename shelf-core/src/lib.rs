//! Data model for multi-source library reconciliation.
//!
//! Defines the records adapters produce, the identifier normalization rules
//! that make records from different sources comparable, and the canonical
//! entities and outcomes the reconciliation engine emits. This crate has no
//! I/O; adapters and the engine live in sibling crates.

pub mod context;
pub mod entity;
pub mod error;
pub mod field;
pub mod identifier;
pub mod normalize;
pub mod outcome;
pub mod policy;
pub mod record;
pub mod source;

pub use context::{LookupCache, RunContext};
pub use entity::{CanonicalEntity, InstallState, MatchMethod, ParentLink, ParentStatus};
pub use error::{ErrorKind, Exclusion, ReconcileError};
pub use field::{FieldError, FieldName, FieldValue, Fields, LooseValue, MergeRule, ValueKind};
pub use identifier::{Identifier, RawKey, SecondaryKey};
pub use normalize::{Normalized, Normalizer, normalize_key};
pub use outcome::Outcome;
pub use policy::ReconcilePolicy;
pub use record::{RawRecord, RawRow, RecordBatch, SourceRole};
pub use source::{SourceKind, SourceParseError};
