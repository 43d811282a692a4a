//! Canonical identifiers and the raw keys they are normalized from.
//!
//! An [`Identifier`] can only be produced by the normalizer (see
//! [`crate::normalize`]), so two records are equivalent exactly when their
//! raw keys normalized to the same value under the same source rule.

use serde::{Deserialize, Serialize};

/// A key exactly as a source reported it, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawKey {
    Integer(i64),
    Text(String),
}

impl RawKey {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl From<&str> for RawKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for RawKey {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl std::fmt::Display for RawKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Canonical key for entity equivalence within one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap an already-canonical value. Only the normalizer calls this.
    pub(crate) fn new_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fallback matching key (namespace, slug, release key) used when the
/// installation-time and catalog identifiers of one entity differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SecondaryKey(String);

impl SecondaryKey {
    /// Build a secondary key: trimmed and lower-cased. Blank input yields `None`.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecondaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
