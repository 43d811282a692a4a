//! Snapshot document model.
//!
//! A snapshot is one source's records captured as a document, either as a
//! flat list of records or as a primary table with auxiliary tables that are
//! joined on load:
//!
//! ```yaml
//! source: gog
//! role: owned
//! records:
//!   - key: gog_1207658924
//!     secondary: witcher
//!     fields:
//!       name: The Witcher
//!       genres: [RPG]
//! ```
//!
//! Field names are the closed [`FieldName`] vocabulary; a misspelled field is
//! a parse error, not a new field.

use std::collections::BTreeMap;

use serde::Deserialize;
use shelf_core::{
    FieldName, FieldValue, Fields, LooseValue, RawKey, RawRow, RecordBatch, ReconcileError,
    RunContext, SourceKind, SourceRole,
};
use shelf_reconcile::{AuxTable, FoldRule, JoinOn, TableJoiner};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub source: SourceKind,
    pub role: SourceRole,
    #[serde(default)]
    pub records: Vec<SnapshotRow>,
    #[serde(default)]
    pub tables: Option<SnapshotTables>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotRow {
    #[serde(default)]
    pub key: Option<RawKey>,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<FieldName, LooseValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotTables {
    pub primary: SnapshotTable,
    #[serde(default)]
    pub auxiliary: Vec<SnapshotAux>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotTable {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<SnapshotRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotJoin {
    #[default]
    Identifier,
    SecondaryKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFold {
    FirstWins,
    Accumulate,
}

/// An auxiliary table. Omitting `rows` records that the source lacked the table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotAux {
    pub name: String,
    #[serde(default)]
    pub join_on: SnapshotJoin,
    #[serde(default)]
    pub rows: Option<Vec<SnapshotRow>>,
    #[serde(default)]
    pub folds: BTreeMap<FieldName, SnapshotFold>,
}

impl SnapshotRow {
    /// Coerce loose values into typed fields. Values that don't fit are
    /// reported and left unknown.
    fn into_raw(
        self,
        origin: SourceKind,
        table: Option<&str>,
        position: usize,
        errors: &mut Vec<ReconcileError>,
    ) -> RawRow {
        let mut fields = Fields::new();
        for (name, loose) in self.fields {
            let stored = FieldValue::coerce(name, loose)
                .and_then(|value| fields.set(name, value).map(|_| ()));
            if let Err(e) = stored {
                let row = match &self.key {
                    Some(key) => format!("'{}'", key),
                    None => format!("#{}", position + 1),
                };
                let record = match table {
                    Some(table) => format!("{} {}", table, row),
                    None => row,
                };
                errors.push(ReconcileError::malformed(origin, record, e.to_string()));
            }
        }
        RawRow {
            key: self.key,
            secondary: self.secondary,
            fields,
        }
    }
}

fn convert_rows(
    rows: Vec<SnapshotRow>,
    origin: SourceKind,
    table: Option<&str>,
    errors: &mut Vec<ReconcileError>,
) -> Vec<RawRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| row.into_raw(origin, table, i, errors))
        .collect()
}

impl Snapshot {
    /// Normalize (and, for multi-table snapshots, join) into a record batch.
    pub fn into_batch(self, ctx: &mut RunContext) -> RecordBatch {
        let origin = self.source;
        let role = self.role;
        let mut errors = Vec::new();

        let mut batch = match self.tables {
            Some(tables) => {
                let primary_rows =
                    convert_rows(tables.primary.rows, origin, Some(&tables.primary.name), &mut errors);
                let mut joiner = TableJoiner::new(origin, role)
                    .primary(tables.primary.name.clone(), Some(primary_rows));
                for aux in tables.auxiliary {
                    let rows = aux
                        .rows
                        .map(|rows| convert_rows(rows, origin, Some(&aux.name), &mut errors));
                    let join_on = match aux.join_on {
                        SnapshotJoin::Identifier => JoinOn::Identifier,
                        SnapshotJoin::SecondaryKey => JoinOn::SecondaryKey,
                    };
                    let mut table = AuxTable::new(aux.name, join_on, rows);
                    for (field, fold) in aux.folds {
                        let rule = match fold {
                            SnapshotFold::FirstWins => FoldRule::FirstWins,
                            SnapshotFold::Accumulate => FoldRule::Accumulate,
                        };
                        table = table.fold(field, rule);
                    }
                    joiner = joiner.auxiliary(table);
                }
                joiner.join(&mut ctx.normalizer)
            }
            None => {
                let rows = convert_rows(self.records, origin, None, &mut errors);
                ctx.normalizer.normalize_rows(rows, origin, role)
            }
        };

        errors.append(&mut batch.errors);
        batch.errors = errors;
        batch
    }
}
