//! In-memory joins across the tables of one structured source.
//!
//! Launcher databases split what they know about a game across several tables
//! (details, tags, play tasks, last-played dates) and offer nothing better than
//! full-table reads. The joiner indexes every auxiliary table once, then folds
//! the matching auxiliary rows into each row of the primary table.

use std::collections::HashMap;

use shelf_core::{
    FieldName, FieldValue, Fields, Identifier, Normalized, Normalizer, RawRecord, RawRow,
    RecordBatch, ReconcileError, SecondaryKey, SourceKind, SourceRole, ValueKind,
};

/// Which key of a primary row an auxiliary table joins against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOn {
    /// The auxiliary row's key normalizes to the primary row's identifier.
    Identifier,
    /// The auxiliary row's key equals the primary row's secondary key.
    SecondaryKey,
}

/// How several matching rows contribute to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldRule {
    /// Keep the first known value (the primary row's own value counts as first).
    FirstWins,
    /// Union every match into a set. Only meaningful for set-valued fields;
    /// other kinds fall back to first-wins.
    Accumulate,
}

/// A named table read in full from a source.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub rows: Vec<RawRow>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<RawRow>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// An auxiliary table. `rows` is `None` when the source lacks the table.
///
/// The join value of each auxiliary row is its `key`.
#[derive(Debug, Clone)]
pub struct AuxTable {
    pub name: String,
    pub join_on: JoinOn,
    pub rows: Option<Vec<RawRow>>,
    folds: HashMap<FieldName, FoldRule>,
}

impl AuxTable {
    pub fn new(name: impl Into<String>, join_on: JoinOn, rows: Option<Vec<RawRow>>) -> Self {
        Self {
            name: name.into(),
            join_on,
            rows,
            folds: HashMap::new(),
        }
    }

    pub fn present(name: impl Into<String>, join_on: JoinOn, rows: Vec<RawRow>) -> Self {
        Self::new(name, join_on, Some(rows))
    }

    pub fn absent(name: impl Into<String>, join_on: JoinOn) -> Self {
        Self::new(name, join_on, None)
    }

    /// Override the fold rule for one field of this table.
    pub fn fold(mut self, field: FieldName, rule: FoldRule) -> Self {
        self.folds.insert(field, rule);
        self
    }

    pub fn fold_rule(&self, field: FieldName) -> FoldRule {
        match self.folds.get(&field) {
            Some(rule) => *rule,
            None if field.kind() == ValueKind::Set => FoldRule::Accumulate,
            None => FoldRule::FirstWins,
        }
    }
}

/// Hash index of one auxiliary table, built once per run.
enum AuxIndex {
    ById(HashMap<Identifier, Vec<usize>>),
    BySecondary(HashMap<SecondaryKey, Vec<usize>>),
}

impl AuxIndex {
    fn lookup(&self, record: &RawRecord) -> &[usize] {
        let hits = match self {
            Self::ById(index) => index.get(&record.id),
            Self::BySecondary(index) => record
                .secondary_key
                .as_ref()
                .and_then(|key| index.get(key)),
        };
        hits.map(Vec::as_slice).unwrap_or(&[])
    }
}

struct IndexedTable {
    table: AuxTable,
    rows: Vec<RawRow>,
    index: AuxIndex,
}

/// Joins a primary table with any number of auxiliary tables.
pub struct TableJoiner {
    origin: SourceKind,
    role: SourceRole,
    primary: Option<Table>,
    primary_name: String,
    auxiliary: Vec<AuxTable>,
}

impl TableJoiner {
    pub fn new(origin: SourceKind, role: SourceRole) -> Self {
        Self {
            origin,
            role,
            primary: None,
            primary_name: String::from("primary"),
            auxiliary: Vec::new(),
        }
    }

    /// Set the primary table. `rows` is `None` when the source lacks it.
    pub fn primary(mut self, name: impl Into<String>, rows: Option<Vec<RawRow>>) -> Self {
        self.primary_name = name.into();
        self.primary = rows.map(|rows| Table::new(self.primary_name.clone(), rows));
        self
    }

    pub fn auxiliary(mut self, table: AuxTable) -> Self {
        self.auxiliary.push(table);
        self
    }

    /// Produce one merged record per primary row.
    pub fn join(self, normalizer: &mut Normalizer) -> RecordBatch {
        let origin = self.origin;
        let role = self.role;
        let mut batch = RecordBatch::empty(origin, role);

        let primary = match self.primary {
            Some(table) if !table.rows.is_empty() => table,
            Some(_) => {
                return RecordBatch::unavailable(
                    origin,
                    role,
                    format!("table '{}' is empty", self.primary_name),
                );
            }
            None => {
                return RecordBatch::unavailable(
                    origin,
                    role,
                    format!("table '{}' is missing", self.primary_name),
                );
            }
        };

        let indexed: Vec<IndexedTable> = self
            .auxiliary
            .into_iter()
            .filter_map(|aux| index_table(aux, origin, normalizer, &mut batch.errors))
            .collect();

        let total = primary.rows.len();
        let mut matched_rows = vec![0usize; indexed.len()];

        for row in primary.rows {
            let mut record = match normalizer.normalize_row(row, origin, role, Some(&primary.name)) {
                Ok(record) => record,
                Err(e) => {
                    batch.errors.push(e);
                    continue;
                }
            };

            for (t, aux) in indexed.iter().enumerate() {
                let hits = aux.index.lookup(&record);
                if !hits.is_empty() {
                    matched_rows[t] += 1;
                }
                for &i in hits {
                    fold_into(&mut record.fields, &aux.rows[i].fields, &aux.table);
                }
            }

            batch.push(record);
        }

        for (aux, matched) in indexed.iter().zip(&matched_rows) {
            log::debug!(
                "{}: table '{}' matched {} of {} '{}' rows",
                origin.short_name(),
                aux.table.name,
                matched,
                total,
                primary.name,
            );
        }

        batch
    }
}

/// Index an auxiliary table by its join key. Absent tables degrade to `None`.
fn index_table(
    mut table: AuxTable,
    origin: SourceKind,
    normalizer: &mut Normalizer,
    errors: &mut Vec<ReconcileError>,
) -> Option<IndexedTable> {
    let Some(rows) = table.rows.take() else {
        log::warn!(
            "{}: auxiliary table '{}' unavailable, its fields stay unknown",
            origin.short_name(),
            table.name,
        );
        return None;
    };

    let mut kept = Vec::with_capacity(rows.len());
    let mut index = match table.join_on {
        JoinOn::Identifier => AuxIndex::ById(HashMap::new()),
        JoinOn::SecondaryKey => AuxIndex::BySecondary(HashMap::new()),
    };

    for row in rows {
        let position = kept.len();
        let indexed = match &mut index {
            AuxIndex::ById(map) => match normalizer.normalize(row.key.as_ref(), origin) {
                Normalized::Id(id) => {
                    map.entry(id).or_default().push(position);
                    true
                }
                Normalized::Keyless { ordinal, .. } => {
                    errors.push(missing_key(origin, &table.name, ordinal));
                    false
                }
            },
            AuxIndex::BySecondary(map) => {
                match row
                    .key
                    .as_ref()
                    .and_then(|key| SecondaryKey::new(&key.to_string()))
                {
                    Some(key) => {
                        map.entry(key).or_default().push(position);
                        true
                    }
                    None => {
                        let ordinal = normalizer.next_keyless(origin);
                        errors.push(missing_key(origin, &table.name, ordinal));
                        false
                    }
                }
            }
        };
        if indexed {
            kept.push(row);
        }
    }

    Some(IndexedTable {
        table,
        rows: kept,
        index,
    })
}

fn missing_key(origin: SourceKind, table: &str, ordinal: usize) -> ReconcileError {
    ReconcileError::MissingIdentifier {
        origin,
        table: Some(table.to_string()),
        ordinal,
    }
}

/// Fold one auxiliary row's fields into a record under the table's rules.
fn fold_into(target: &mut Fields, source: &Fields, table: &AuxTable) {
    for (name, value) in source.iter() {
        let accumulate = table.fold_rule(name) == FoldRule::Accumulate;
        match value {
            FieldValue::Set(items) if accumulate => {
                if let Err(e) = target.extend_set(name, items.iter().cloned()) {
                    log::warn!("Table '{}': {}", table.name, e);
                }
            }
            _ if target.contains(name) => {}
            _ => {
                if let Err(e) = target.set(name, value.clone()) {
                    log::warn!("Table '{}': {}", table.name, e);
                }
            }
        }
    }
}
