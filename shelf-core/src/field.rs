//! Closed field vocabulary for raw records and canonical entities.
//!
//! Source records carry heterogeneous optional fields. Every field a source
//! may report is a [`FieldName`] variant with a fixed [`ValueKind`], so a typo
//! in an adapter or snapshot document is a parse error instead of a phantom
//! field. Absence of a field means "unknown", never "empty".

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every field a source can report about an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Name,
    InstallPath,
    Executable,
    LaunchCommand,
    UninstallCommand,
    InstallSize,
    Version,
    LastPlayed,
    /// Total play time in minutes.
    PlayTime,
    Description,
    Developer,
    Publisher,
    Genres,
    Tags,
    CoverImage,
    IconImage,
    ReleaseDate,
    Rating,
    Hidden,
    /// Raw key of the base entity this record is an addon of.
    ParentRef,
    /// Source-specific signal that the record is an addon (DLC, soundtrack, expansion).
    DependentHint,
}

/// The type of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Path,
    Integer,
    Float,
    Bool,
    Timestamp,
    Set,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Path => "path",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Set => "set",
        };
        f.write_str(s)
    }
}

/// Which side wins when an installed and an owned record both know a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Local-machine facts: the installed record is ground truth.
    PreferInstalled,
    /// Catalog facts: the store's metadata wins.
    PreferOwned,
    /// Both sides contribute (set-valued fields only).
    Union,
}

const ALL_FIELDS: &[FieldName] = &[
    FieldName::Name,
    FieldName::InstallPath,
    FieldName::Executable,
    FieldName::LaunchCommand,
    FieldName::UninstallCommand,
    FieldName::InstallSize,
    FieldName::Version,
    FieldName::LastPlayed,
    FieldName::PlayTime,
    FieldName::Description,
    FieldName::Developer,
    FieldName::Publisher,
    FieldName::Genres,
    FieldName::Tags,
    FieldName::CoverImage,
    FieldName::IconImage,
    FieldName::ReleaseDate,
    FieldName::Rating,
    FieldName::Hidden,
    FieldName::ParentRef,
    FieldName::DependentHint,
];

impl FieldName {
    pub fn all() -> &'static [FieldName] {
        ALL_FIELDS
    }

    /// Snake-case name as used in snapshot documents and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::InstallPath => "install_path",
            Self::Executable => "executable",
            Self::LaunchCommand => "launch_command",
            Self::UninstallCommand => "uninstall_command",
            Self::InstallSize => "install_size",
            Self::Version => "version",
            Self::LastPlayed => "last_played",
            Self::PlayTime => "play_time",
            Self::Description => "description",
            Self::Developer => "developer",
            Self::Publisher => "publisher",
            Self::Genres => "genres",
            Self::Tags => "tags",
            Self::CoverImage => "cover_image",
            Self::IconImage => "icon_image",
            Self::ReleaseDate => "release_date",
            Self::Rating => "rating",
            Self::Hidden => "hidden",
            Self::ParentRef => "parent_ref",
            Self::DependentHint => "dependent_hint",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::InstallPath | Self::Executable => ValueKind::Path,
            Self::InstallSize | Self::PlayTime => ValueKind::Integer,
            Self::LastPlayed | Self::ReleaseDate => ValueKind::Timestamp,
            Self::Genres | Self::Tags => ValueKind::Set,
            Self::Rating => ValueKind::Float,
            Self::Hidden | Self::DependentHint => ValueKind::Bool,
            Self::Name
            | Self::LaunchCommand
            | Self::UninstallCommand
            | Self::Version
            | Self::Description
            | Self::Developer
            | Self::Publisher
            | Self::CoverImage
            | Self::IconImage
            | Self::ParentRef => ValueKind::Text,
        }
    }

    pub fn merge_rule(&self) -> MergeRule {
        match self {
            Self::InstallPath
            | Self::Executable
            | Self::LaunchCommand
            | Self::UninstallCommand
            | Self::InstallSize
            | Self::Version
            | Self::LastPlayed
            | Self::PlayTime => MergeRule::PreferInstalled,

            Self::Description
            | Self::Developer
            | Self::Publisher
            | Self::Genres
            | Self::CoverImage
            | Self::IconImage
            | Self::ReleaseDate
            | Self::Rating => MergeRule::PreferOwned,

            Self::Tags => MergeRule::Union,

            // No explicit rule: the installed record reflects the local machine.
            Self::Name | Self::Hidden | Self::ParentRef | Self::DependentHint => {
                MergeRule::PreferInstalled
            }
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("field '{field}' expects a {expected} value, got {found}")]
    KindMismatch {
        field: FieldName,
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("field '{field}': cannot read {value:?} as {expected}")]
    Unparseable {
        field: FieldName,
        expected: ValueKind,
        value: String,
    },
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Path(PathBuf),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Set(BTreeSet<String>),
}

impl FieldValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Text(_) => ValueKind::Text,
            Self::Path(_) => ValueKind::Path,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Bool(_) => ValueKind::Bool,
            Self::Timestamp(_) => ValueKind::Timestamp,
            Self::Set(_) => ValueKind::Set,
        }
    }

    pub fn set_of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(items.into_iter().map(Into::into).collect())
    }

    /// Convert a format-agnostic value into the kind `field` requires.
    pub fn coerce(field: FieldName, loose: LooseValue) -> Result<Self, FieldError> {
        let expected = field.kind();
        let unparseable = |value: String| FieldError::Unparseable {
            field,
            expected,
            value,
        };

        match (expected, loose) {
            (ValueKind::Text, LooseValue::Text(s)) => Ok(Self::Text(s)),
            (ValueKind::Text, LooseValue::Integer(n)) => Ok(Self::Text(n.to_string())),
            (ValueKind::Text, LooseValue::Float(x)) => Ok(Self::Text(x.to_string())),

            (ValueKind::Path, LooseValue::Text(s)) => Ok(Self::Path(PathBuf::from(s))),

            (ValueKind::Integer, LooseValue::Integer(n)) => Ok(Self::Integer(n)),
            (ValueKind::Integer, LooseValue::Text(s)) => s
                .trim()
                .parse()
                .map(Self::Integer)
                .map_err(|_| unparseable(s)),

            (ValueKind::Float, LooseValue::Float(x)) => Ok(Self::Float(x)),
            (ValueKind::Float, LooseValue::Integer(n)) => Ok(Self::Float(n as f64)),
            (ValueKind::Float, LooseValue::Text(s)) => s
                .trim()
                .parse()
                .map(Self::Float)
                .map_err(|_| unparseable(s)),

            (ValueKind::Bool, LooseValue::Bool(b)) => Ok(Self::Bool(b)),
            (ValueKind::Bool, LooseValue::Integer(n)) => match n {
                0 => Ok(Self::Bool(false)),
                1 => Ok(Self::Bool(true)),
                _ => Err(unparseable(n.to_string())),
            },
            (ValueKind::Bool, LooseValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Self::Bool(true)),
                "false" | "no" | "0" => Ok(Self::Bool(false)),
                _ => Err(unparseable(s)),
            },

            (ValueKind::Timestamp, LooseValue::Integer(secs)) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(Self::Timestamp)
                .ok_or_else(|| unparseable(secs.to_string())),
            (ValueKind::Timestamp, LooseValue::Text(s)) => {
                parse_timestamp(&s).map(Self::Timestamp).ok_or_else(|| unparseable(s))
            }

            (ValueKind::Set, LooseValue::List(items)) => Ok(Self::set_of(
                items
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            )),
            (ValueKind::Set, LooseValue::Text(s)) => Ok(Self::set_of(
                s.split(',').map(str::trim).filter(|s| !s.is_empty()),
            )),
            (ValueKind::Set, LooseValue::Integer(n)) => Ok(Self::set_of([n.to_string()])),

            (_, other) => Err(FieldError::KindMismatch {
                field,
                expected,
                found: other.kind(),
            }),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<PathBuf> for FieldValue {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for FieldValue {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

/// Accepts unix seconds, RFC 3339, `YYYY-MM-DD HH:MM:SS`, and `YYYY-MM-DD`.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single();
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// A field value as read from a loosely typed medium (YAML, JSON, SQLite).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl LooseValue {
    fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Text(_) => ValueKind::Text,
            Self::List(_) => ValueKind::Set,
        }
    }
}

/// The known fields of one record. Missing keys are unknown values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Fields(BTreeMap<FieldName, FieldValue>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, checking it against the field's kind.
    ///
    /// Returns the previous value, if any.
    pub fn set(
        &mut self,
        name: FieldName,
        value: FieldValue,
    ) -> Result<Option<FieldValue>, FieldError> {
        if value.kind() != name.kind() {
            return Err(FieldError::KindMismatch {
                field: name,
                expected: name.kind(),
                found: value.kind(),
            });
        }
        Ok(self.0.insert(name, value))
    }

    /// Builder form of [`set`](Self::set). A value of the wrong kind is
    /// logged and dropped, leaving the field unknown.
    pub fn with(mut self, name: FieldName, value: impl Into<FieldValue>) -> Self {
        if let Err(e) = self.set(name, value.into()) {
            log::warn!("Dropping field value: {}", e);
        }
        self
    }

    pub fn remove(&mut self, name: FieldName) -> Option<FieldValue> {
        self.0.remove(&name)
    }

    pub fn get(&self, name: FieldName) -> Option<&FieldValue> {
        self.0.get(&name)
    }

    pub fn contains(&self, name: FieldName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    pub fn text(&self, name: FieldName) -> Option<&str> {
        match self.0.get(&name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn path(&self, name: FieldName) -> Option<&Path> {
        match self.0.get(&name) {
            Some(FieldValue::Path(p)) => Some(p),
            _ => None,
        }
    }

    pub fn integer(&self, name: FieldName) -> Option<i64> {
        match self.0.get(&name) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn float(&self, name: FieldName) -> Option<f64> {
        match self.0.get(&name) {
            Some(FieldValue::Float(x)) => Some(*x),
            _ => None,
        }
    }

    pub fn bool(&self, name: FieldName) -> Option<bool> {
        match self.0.get(&name) {
            Some(FieldValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn timestamp(&self, name: FieldName) -> Option<DateTime<Utc>> {
        match self.0.get(&name) {
            Some(FieldValue::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn set_of(&self, name: FieldName) -> Option<&BTreeSet<String>> {
        match self.0.get(&name) {
            Some(FieldValue::Set(items)) => Some(items),
            _ => None,
        }
    }

    /// Add items to a set-valued field, creating it if unknown.
    pub fn extend_set<I>(&mut self, name: FieldName, items: I) -> Result<(), FieldError>
    where
        I: IntoIterator<Item = String>,
    {
        if name.kind() != ValueKind::Set {
            return Err(FieldError::KindMismatch {
                field: name,
                expected: name.kind(),
                found: ValueKind::Set,
            });
        }
        match self.0.get_mut(&name) {
            Some(FieldValue::Set(existing)) => existing.extend(items),
            _ => {
                self.0.insert(name, FieldValue::Set(items.into_iter().collect()));
            }
        }
        Ok(())
    }
}

impl IntoIterator for Fields {
    type Item = (FieldName, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<FieldName, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
