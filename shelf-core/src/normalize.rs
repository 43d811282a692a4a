//! Identifier normalization.
//!
//! Each source assigns identifiers its own way: GOG release keys carry a
//! `gog_` prefix that installation records omit, Steam manifests are named
//! after the app id, Amazon product ids carry a long namespace prefix. The
//! rules here map every raw key onto one canonical [`Identifier`] per entity.
//!
//! [`normalize_key`] is total and pure. [`Normalizer`] adds the per-source
//! running counter used to label records that carry no usable key.

use std::collections::HashMap;

use crate::error::ReconcileError;
use crate::identifier::{Identifier, RawKey, SecondaryKey};
use crate::record::{RawRecord, RawRow, RecordBatch, SourceRole};
use crate::source::SourceKind;

const STEAM_MANIFEST_PREFIX: &str = "appmanifest_";
const STEAM_MANIFEST_SUFFIX: &str = ".acf";
const GOG_RELEASE_PREFIX: &str = "gog_";
const AMAZON_PRODUCT_PREFIX: &str = "amzn1.adg.product.";

/// Normalize a raw key under `source`'s rule.
///
/// Returns `None` when the key is blank or does not fit the source's
/// identifier scheme (e.g. a non-numeric Steam app id).
pub fn normalize_key(raw: &RawKey, source: SourceKind) -> Option<Identifier> {
    let canonical = match raw {
        RawKey::Integer(n) => {
            if source.numeric_ids() && *n <= 0 {
                return None;
            }
            normalize_text(&n.to_string(), source)?
        }
        RawKey::Text(s) => normalize_text(s, source)?,
    };
    Some(Identifier::new_canonical(canonical))
}

fn normalize_text(raw: &str, source: SourceKind) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match source {
        SourceKind::Steam => {
            let stripped = strip_prefix_ci(trimmed, STEAM_MANIFEST_PREFIX);
            let stripped = stripped
                .strip_suffix(STEAM_MANIFEST_SUFFIX)
                .unwrap_or(stripped);
            parse_positive(stripped)
        }
        SourceKind::Gog => parse_positive(strip_prefix_ci(trimmed, GOG_RELEASE_PREFIX)),
        SourceKind::Ubisoft | SourceKind::Itch => parse_positive(trimmed),
        SourceKind::Epic | SourceKind::Local => Some(trimmed.to_string()),
        SourceKind::Ea => Some(trimmed.to_uppercase()),
        SourceKind::Amazon => {
            let stripped = strip_prefix_ci(trimmed, AMAZON_PRODUCT_PREFIX);
            non_empty(stripped.to_lowercase())
        }
        SourceKind::BattleNet => non_empty(trimmed.to_lowercase()),
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

fn parse_positive(s: &str) -> Option<String> {
    match s.parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n.to_string()),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

impl Identifier {
    /// Normalize a raw key under `source`'s rule. Shorthand for [`normalize_key`].
    pub fn parse(raw: impl Into<RawKey>, source: SourceKind) -> Option<Identifier> {
        normalize_key(&raw.into(), source)
    }
}

/// Result of normalizing one row's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Id(Identifier),
    /// No usable key. `ordinal` is the 1-based running count of keyless rows
    /// seen from `origin` in this run; it labels error messages and is never
    /// an identifier.
    Keyless { origin: SourceKind, ordinal: usize },
}

/// Per-run normalizer. Owns the keyless counters for every source.
#[derive(Debug, Default)]
pub struct Normalizer {
    keyless: HashMap<SourceKind, usize>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: Option<&RawKey>, origin: SourceKind) -> Normalized {
        match raw.and_then(|key| normalize_key(key, origin)) {
            Some(id) => Normalized::Id(id),
            None => {
                let ordinal = self.next_keyless(origin);
                log::debug!(
                    "{}: record #{} has no usable identifier ({:?})",
                    origin.short_name(),
                    ordinal,
                    raw
                );
                Normalized::Keyless { origin, ordinal }
            }
        }
    }

    /// Advance `origin`'s keyless counter and return the new ordinal.
    ///
    /// Adapters that reject a row for a missing join key of their own use this
    /// so every keyless report from one source is numbered uniquely.
    pub fn next_keyless(&mut self, origin: SourceKind) -> usize {
        let counter = self.keyless.entry(origin).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Number of keyless rows seen from `origin` so far.
    pub fn keyless_count(&self, origin: SourceKind) -> usize {
        self.keyless.get(&origin).copied().unwrap_or(0)
    }

    /// Normalize one row into a record, or the error reporting its missing key.
    pub fn normalize_row(
        &mut self,
        row: RawRow,
        origin: SourceKind,
        role: SourceRole,
        table: Option<&str>,
    ) -> Result<RawRecord, ReconcileError> {
        match self.normalize(row.key.as_ref(), origin) {
            Normalized::Id(id) => Ok(RawRecord {
                id,
                secondary_key: row.secondary.as_deref().and_then(SecondaryKey::new),
                origin,
                role,
                fields: row.fields,
            }),
            Normalized::Keyless { origin, ordinal } => Err(ReconcileError::MissingIdentifier {
                origin,
                table: table.map(str::to_string),
                ordinal,
            }),
        }
    }

    /// Normalize a single-table source into a batch.
    pub fn normalize_rows(
        &mut self,
        rows: Vec<RawRow>,
        origin: SourceKind,
        role: SourceRole,
    ) -> RecordBatch {
        let mut batch = RecordBatch::empty(origin, role);
        for row in rows {
            match self.normalize_row(row, origin, role, None) {
                Ok(record) => batch.push(record),
                Err(e) => batch.errors.push(e),
            }
        }
        batch
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
