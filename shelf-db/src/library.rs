//! Full-table reads of a launcher library into record batches.
//!
//! Each table is read once into memory and handed to the [`TableJoiner`];
//! the database is never queried per entity.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::Connection;
use rusqlite::types::ValueRef;
use shelf_core::{
    FieldName, FieldValue, Fields, LookupCache, LooseValue, RawKey, RawRow, RecordBatch,
    ReconcileError, ReconcilePolicy, RunContext, SourceKind, SourceRole,
};
use shelf_reconcile::{AuxTable, JoinOn, TableJoiner};

use crate::schema::{DbError, open_library, table_exists};

/// Columns of one table the reader maps onto fields.
struct TableSpec {
    name: &'static str,
    key: &'static str,
    secondary: Option<&'static str>,
    /// SQL expression and the field it fills.
    columns: &'static [(&'static str, FieldName)],
    order_by: Option<&'static str>,
}

impl TableSpec {
    fn select_sql(&self, filter_column: Option<&str>) -> String {
        let mut sql = format!(
            "SELECT {}, {}",
            self.key,
            self.secondary.unwrap_or("NULL")
        );
        for (expr, _) in self.columns {
            sql.push_str(", ");
            sql.push_str(expr);
        }
        sql.push_str(" FROM ");
        sql.push_str(self.name);
        if let Some(column) = filter_column {
            sql.push_str(&format!(" WHERE {} = ?1", column));
        }
        if let Some(order) = self.order_by {
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        sql
    }
}

const LIBRARY_RELEASES: TableSpec = TableSpec {
    name: "library_releases",
    key: "release_key",
    secondary: Some("slug"),
    columns: &[("title", FieldName::Name)],
    order_by: Some("rowid"),
};

const GAME_DETAILS: TableSpec = TableSpec {
    name: "game_details",
    key: "release_key",
    secondary: None,
    columns: &[
        ("description", FieldName::Description),
        ("developer", FieldName::Developer),
        ("publisher", FieldName::Publisher),
        ("release_date", FieldName::ReleaseDate),
        ("cover_url", FieldName::CoverImage),
        ("rating", FieldName::Rating),
        ("genre_ids", FieldName::Genres),
    ],
    order_by: Some("rowid"),
};

const USER_TAGS: TableSpec = TableSpec {
    name: "user_tags",
    key: "release_key",
    secondary: None,
    columns: &[("tag", FieldName::Tags)],
    order_by: None,
};

const LAST_PLAYED: TableSpec = TableSpec {
    name: "last_played",
    key: "release_key",
    secondary: None,
    columns: &[("last_played_at", FieldName::LastPlayed)],
    order_by: Some("last_played_at DESC"),
};

const HIDDEN_RELEASES: TableSpec = TableSpec {
    name: "hidden_releases",
    key: "release_key",
    secondary: None,
    columns: &[("1", FieldName::Hidden)],
    order_by: None,
};

const DLC_LINKS: TableSpec = TableSpec {
    name: "dlc_links",
    key: "release_key",
    secondary: None,
    columns: &[("parent_release_key", FieldName::ParentRef)],
    order_by: Some("rowid"),
};

const INSTALLED_PRODUCTS: TableSpec = TableSpec {
    name: "installed_products",
    key: "product_id",
    secondary: Some("slug"),
    columns: &[
        ("install_path", FieldName::InstallPath),
        ("version", FieldName::Version),
        ("install_size", FieldName::InstallSize),
    ],
    order_by: Some("rowid"),
};

const PLAY_TASKS: TableSpec = TableSpec {
    name: "play_tasks",
    key: "product_id",
    secondary: None,
    columns: &[
        ("executable", FieldName::Executable),
        (
            "TRIM(executable || ' ' || COALESCE(arguments, ''))",
            FieldName::LaunchCommand,
        ),
    ],
    order_by: Some("is_primary DESC, rowid"),
};

const GENRE_LOOKUP: &str = "genres";

fn raw_key(value: ValueRef<'_>) -> Option<RawKey> {
    match value {
        ValueRef::Integer(n) => Some(RawKey::Integer(n)),
        ValueRef::Text(t) => Some(RawKey::Text(String::from_utf8_lossy(t).into_owned())),
        _ => None,
    }
}

fn loose_value(value: ValueRef<'_>) -> Option<LooseValue> {
    match value {
        ValueRef::Integer(n) => Some(LooseValue::Integer(n)),
        ValueRef::Real(x) => Some(LooseValue::Float(x)),
        ValueRef::Text(t) => Some(LooseValue::Text(String::from_utf8_lossy(t).into_owned())),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Read every row of a table. `Ok(None)` means this database lacks the table.
///
/// Values that don't fit their field are reported as malformed and left unknown.
fn read_rows(
    conn: &Connection,
    spec: &TableSpec,
    filter: Option<(&str, &str)>,
    origin: SourceKind,
    errors: &mut Vec<ReconcileError>,
) -> Result<Option<Vec<RawRow>>, DbError> {
    if !table_exists(conn, spec.name)? {
        return Ok(None);
    }

    let sql = spec.select_sql(filter.map(|(column, _)| column));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match filter {
        Some((_, value)) => stmt.query([value])?,
        None => stmt.query([])?,
    };

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let key = raw_key(row.get_ref(0)?);
        let secondary = match row.get_ref(1)? {
            ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
            _ => None,
        };
        let mut fields = Fields::new();
        for (i, (_, field)) in spec.columns.iter().enumerate() {
            let Some(loose) = loose_value(row.get_ref(i + 2)?) else {
                continue;
            };
            let stored = FieldValue::coerce(*field, loose)
                .and_then(|value| fields.set(*field, value).map(|_| ()));
            if let Err(e) = stored {
                let record = match &key {
                    Some(k) => format!("{} '{}'", spec.name, k),
                    None => format!("{} row {}", spec.name, out.len() + 1),
                };
                errors.push(ReconcileError::malformed(origin, record, e.to_string()));
            }
        }
        out.push(RawRow {
            key,
            secondary,
            fields,
        });
    }

    log::debug!("Read {} rows from '{}'", out.len(), spec.name);
    Ok(Some(out))
}

fn read_genres(conn: &Connection) -> Result<HashMap<String, String>, DbError> {
    if !table_exists(conn, GENRE_LOOKUP)? {
        log::warn!("Genre dictionary missing, genre ids stay unresolved");
        return Ok(HashMap::new());
    }
    let mut stmt = conn.prepare("SELECT id, name FROM genres")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?.to_string(), row.get::<_, String>(1)?))
    })?;
    rows.collect::<Result<HashMap<_, _>, _>>().map_err(Into::into)
}

/// Replace genre ids with their names from the per-run genre dictionary.
fn resolve_genres(
    conn: &Connection,
    rows: &mut [RawRow],
    lookups: &mut LookupCache,
) -> Result<(), DbError> {
    let names = lookups.get_or_fill(GENRE_LOOKUP, || read_genres(conn))?;
    for row in rows {
        let Some(ids) = row.fields.set_of(FieldName::Genres) else {
            continue;
        };
        let resolved: Vec<String> = ids
            .iter()
            .map(|id| names.get(id).cloned().unwrap_or_else(|| id.clone()))
            .collect();
        if let Err(e) = row.fields.set(FieldName::Genres, FieldValue::set_of(resolved)) {
            log::warn!("{}", e);
        }
    }
    Ok(())
}

/// Read the owned side: entitlements joined with details, tags, play dates,
/// hidden flags, and DLC links. `account` scopes entitlements to one user.
pub fn read_owned(
    conn: &Connection,
    origin: SourceKind,
    account: Option<&str>,
    ctx: &mut RunContext,
) -> RecordBatch {
    match try_read_owned(conn, origin, account, ctx) {
        Ok(batch) => batch,
        Err(e) => RecordBatch::failed(origin, SourceRole::Owned, "library database", e),
    }
}

fn try_read_owned(
    conn: &Connection,
    origin: SourceKind,
    account: Option<&str>,
    ctx: &mut RunContext,
) -> Result<RecordBatch, DbError> {
    let mut errors = Vec::new();
    let filter = account.map(|a| ("user_id", a));

    let releases = read_rows(conn, &LIBRARY_RELEASES, filter, origin, &mut errors)?;
    let mut details = read_rows(conn, &GAME_DETAILS, None, origin, &mut errors)?;
    if let Some(rows) = details.as_mut() {
        resolve_genres(conn, rows, &mut ctx.lookups)?;
    }
    let tags = read_rows(conn, &USER_TAGS, None, origin, &mut errors)?;
    let played = read_rows(conn, &LAST_PLAYED, None, origin, &mut errors)?;
    let hidden = read_rows(conn, &HIDDEN_RELEASES, None, origin, &mut errors)?;
    let links = read_rows(conn, &DLC_LINKS, None, origin, &mut errors)?;

    let mut batch = TableJoiner::new(origin, SourceRole::Owned)
        .primary(LIBRARY_RELEASES.name, releases)
        .auxiliary(AuxTable::new(GAME_DETAILS.name, JoinOn::Identifier, details))
        .auxiliary(AuxTable::new(USER_TAGS.name, JoinOn::Identifier, tags))
        .auxiliary(AuxTable::new(LAST_PLAYED.name, JoinOn::Identifier, played))
        .auxiliary(AuxTable::new(HIDDEN_RELEASES.name, JoinOn::Identifier, hidden))
        .auxiliary(AuxTable::new(DLC_LINKS.name, JoinOn::Identifier, links))
        .join(&mut ctx.normalizer);

    errors.append(&mut batch.errors);
    batch.errors = errors;
    Ok(batch)
}

/// Read the installed side: installed products joined with their play tasks.
pub fn read_installed(conn: &Connection, origin: SourceKind, ctx: &mut RunContext) -> RecordBatch {
    match try_read_installed(conn, origin, ctx) {
        Ok(batch) => batch,
        Err(e) => RecordBatch::failed(origin, SourceRole::Installed, "library database", e),
    }
}

fn try_read_installed(
    conn: &Connection,
    origin: SourceKind,
    ctx: &mut RunContext,
) -> Result<RecordBatch, DbError> {
    let mut errors = Vec::new();
    let products = read_rows(conn, &INSTALLED_PRODUCTS, None, origin, &mut errors)?;
    let tasks = read_rows(conn, &PLAY_TASKS, None, origin, &mut errors)?;

    let mut batch = TableJoiner::new(origin, SourceRole::Installed)
        .primary(INSTALLED_PRODUCTS.name, products)
        .auxiliary(AuxTable::new(PLAY_TASKS.name, JoinOn::Identifier, tasks))
        .join(&mut ctx.normalizer);

    errors.append(&mut batch.errors);
    batch.errors = errors;
    Ok(batch)
}

/// Open the database at `path` and read both sides.
///
/// A missing or unopenable file yields one source error per side and no records.
pub fn read_library(
    path: &Path,
    origin: SourceKind,
    policy: &ReconcilePolicy,
    ctx: &mut RunContext,
) -> (RecordBatch, RecordBatch) {
    let conn = match open_library(path) {
        Ok(conn) => conn,
        Err(e) => {
            log::warn!("{}", e);
            let what = e.to_string();
            return (
                RecordBatch::unavailable(origin, SourceRole::Installed, what.clone()),
                RecordBatch::unavailable(origin, SourceRole::Owned, what),
            );
        }
    };

    let installed = read_installed(&conn, origin, ctx);
    let owned = read_owned(&conn, origin, policy.account.as_deref(), ctx);
    (installed, owned)
}
