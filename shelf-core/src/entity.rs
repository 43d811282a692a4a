//! Canonical entities: the merged, deduplicated output records.

use std::path::Path;

use serde::Serialize;

use crate::field::{FieldName, Fields};
use crate::identifier::{Identifier, SecondaryKey};
use crate::source::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    Installed,
    OwnedNotInstalled,
}

/// How an owned record found its installed counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentStatus {
    /// The parent is one of the entities in this run.
    Resolved,
    /// The parent is not present in this run (possibly hidden or filtered upstream).
    Dangling,
    /// Following parents leads back to this entity.
    Cyclic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParentLink {
    pub id: Identifier,
    pub status: ParentStatus,
    /// Set when the parent was inferred from a shared secondary key rather
    /// than named by the source.
    pub inferred: bool,
}

/// One reconciled entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEntity {
    pub id: Identifier,
    /// Installation-time identifiers absorbed through a secondary-key match.
    pub aliases: Vec<Identifier>,
    pub secondary_key: Option<SecondaryKey>,
    pub origin: SourceKind,
    pub install_state: InstallState,
    /// Whether any owned/catalog record backs this entity.
    pub owned: bool,
    pub fields: Fields,
    pub parent: Option<ParentLink>,
    pub dependent: bool,
    pub matched_by: Option<MatchMethod>,
}

impl CanonicalEntity {
    pub fn parent_id(&self) -> Option<&Identifier> {
        self.parent.as_ref().map(|p| &p.id)
    }

    pub fn is_dependent(&self) -> bool {
        self.dependent || self.parent.is_some()
    }

    pub fn is_installed(&self) -> bool {
        self.install_state == InstallState::Installed
    }

    pub fn is_hidden(&self) -> bool {
        self.fields.bool(FieldName::Hidden).unwrap_or(false)
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.text(FieldName::Name)
    }

    pub fn install_path(&self) -> Option<&Path> {
        self.fields.path(FieldName::InstallPath)
    }

    /// Human-readable label for messages: the name when known, else the id.
    pub fn label(&self) -> String {
        match self.name() {
            Some(name) => format!("{} ({})", name, self.id),
            None => self.id.to_string(),
        }
    }
}
