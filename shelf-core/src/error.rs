use thiserror::Error;

use crate::identifier::Identifier;
use crate::record::SourceRole;
use crate::source::SourceKind;

/// Why a canonical entity was left out of the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    Hidden,
    NotInstalled,
    NotOwned,
    Dependent,
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Hidden => "is hidden",
            Self::NotInstalled => "is not installed",
            Self::NotOwned => "is not owned",
            Self::Dependent => "is a DLC",
        };
        f.write_str(s)
    }
}

/// Broad category of a reconciliation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required table, document, or file was absent or unreadable.
    SourceUnavailable,
    /// One record failed normalization or a required-field check.
    RecordMalformed,
    /// A later record collided with an already-merged identifier.
    DuplicateIdentifier,
    /// Not a failure: an entity left out by the caller's policy.
    PolicyExcluded,
}

/// A per-record or per-source problem, reported through the outcome stream.
///
/// None of these abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{origin} source unavailable: {what}")]
    SourceUnavailable { origin: SourceKind, what: String },

    #[error("{origin} source unavailable: {what}: {cause}")]
    SourceFailed {
        origin: SourceKind,
        what: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(
        "missing identifier in source {}{}, record #{}",
        .origin.short_name(),
        table_suffix(.table),
        .ordinal
    )]
    MissingIdentifier {
        origin: SourceKind,
        table: Option<String>,
        ordinal: usize,
    },

    #[error("malformed record {} in source {}: {}", .record, .origin.short_name(), .reason)]
    Malformed {
        origin: SourceKind,
        record: String,
        reason: String,
    },

    #[error("installed record {id} has no valid install path")]
    InvalidInstallPath { id: Identifier },

    #[error("duplicate entry for identifier {id} ({role} records)")]
    DuplicateIdentifier { id: Identifier, role: SourceRole },

    #[error("cyclic parent reference: {id} is its own ancestor")]
    CyclicParent { id: Identifier },

    #[error("parent chain of {id} exceeds {limit} levels")]
    ParentChainTooDeep { id: Identifier, limit: usize },

    #[error("{role} record for {id} matches no entity")]
    OrphanAnnotation { id: Identifier, role: SourceRole },

    #[error("{label} {reason}, excluded by policy")]
    Excluded {
        id: Identifier,
        label: String,
        reason: Exclusion,
    },
}

fn table_suffix(table: &Option<String>) -> String {
    match table {
        Some(t) => format!(" (table '{t}')"),
        None => String::new(),
    }
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } | Self::SourceFailed { .. } => {
                ErrorKind::SourceUnavailable
            }
            Self::MissingIdentifier { .. }
            | Self::Malformed { .. }
            | Self::InvalidInstallPath { .. }
            | Self::CyclicParent { .. }
            | Self::ParentChainTooDeep { .. }
            | Self::OrphanAnnotation { .. } => ErrorKind::RecordMalformed,
            Self::DuplicateIdentifier { .. } => ErrorKind::DuplicateIdentifier,
            Self::Excluded { .. } => ErrorKind::PolicyExcluded,
        }
    }

    pub fn malformed(origin: SourceKind, record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            origin,
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// The identifier this error concerns, when it concerns one entity.
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Self::InvalidInstallPath { id }
            | Self::DuplicateIdentifier { id, .. }
            | Self::CyclicParent { id }
            | Self::ParentChainTooDeep { id, .. }
            | Self::OrphanAnnotation { id, .. }
            | Self::Excluded { id, .. } => Some(id),
            _ => None,
        }
    }
}
