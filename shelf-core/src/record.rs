//! Raw records: one source's partial view of one entity.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::field::{FieldName, FieldValue, Fields};
use crate::identifier::{Identifier, RawKey, SecondaryKey};
use crate::source::SourceKind;

/// What kind of evidence a record is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    /// Physically present on this machine.
    Installed,
    /// Owned or entitled through a catalog, not necessarily installed.
    Owned,
    /// Marks an entity as hidden by the user.
    HiddenFlag,
    /// Carries parent/addon information about an entity.
    RelationshipHint,
}

impl SourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Owned => "owned",
            Self::HiddenFlag => "hidden-flag",
            Self::RelationshipHint => "relationship-hint",
        }
    }

    /// Hidden flags and relationship hints annotate entities instead of creating them.
    pub fn is_annotation(&self) -> bool {
        matches!(self, Self::HiddenFlag | Self::RelationshipHint)
    }
}

impl std::fmt::Display for SourceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row as an adapter read it, before its key is normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub key: Option<RawKey>,
    pub secondary: Option<String>,
    pub fields: Fields,
}

impl RawRow {
    pub fn new(key: impl Into<RawKey>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn keyless() -> Self {
        Self::default()
    }

    pub fn secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn field(mut self, name: FieldName, value: impl Into<FieldValue>) -> Self {
        self.fields = self.fields.with(name, value);
        self
    }
}

/// A normalized record ready for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: Identifier,
    pub secondary_key: Option<SecondaryKey>,
    pub origin: SourceKind,
    pub role: SourceRole,
    pub fields: Fields,
}

/// The in-memory result of one ingestion call: the records a source produced
/// plus every problem encountered while reading it.
#[derive(Debug)]
pub struct RecordBatch {
    pub origin: SourceKind,
    pub role: SourceRole,
    pub records: Vec<RawRecord>,
    pub errors: Vec<ReconcileError>,
}

impl RecordBatch {
    pub fn empty(origin: SourceKind, role: SourceRole) -> Self {
        Self {
            origin,
            role,
            records: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A batch for a source whose required table or document is absent.
    pub fn unavailable(origin: SourceKind, role: SourceRole, what: impl Into<String>) -> Self {
        let mut batch = Self::empty(origin, role);
        batch.errors.push(ReconcileError::SourceUnavailable {
            origin,
            what: what.into(),
        });
        batch
    }

    /// A batch for a source whose medium failed to read.
    pub fn failed<E>(origin: SourceKind, role: SourceRole, what: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut batch = Self::empty(origin, role);
        batch.errors.push(ReconcileError::SourceFailed {
            origin,
            what: what.into(),
            cause: Box::new(cause),
        });
        batch
    }

    pub fn push(&mut self, record: RawRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
