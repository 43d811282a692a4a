//! Shared settings file (`~/.config/shelf/settings.toml`).
//!
//! The `[policy]` table holds the default reconcile policy. Command-line flags
//! are layered on top by the frontend; other tables in the file are left alone
//! when the policy is saved.

use std::io;
use std::path::{Path, PathBuf};

use shelf_core::ReconcilePolicy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("{0} is not a table")]
    NotATable(&'static str),
}

fn io_error(path: &Path, source: io::Error) -> SettingsError {
    SettingsError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Canonical path to the settings file: `~/.config/shelf/settings.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("shelf").join("settings.toml")
}

/// Read the default policy from the settings file.
///
/// A missing file, or a file without a `[policy]` table, yields the
/// all-defaults policy.
pub fn load_policy() -> Result<ReconcilePolicy, SettingsError> {
    load_policy_from(&settings_path())
}

pub fn load_policy_from(path: &Path) -> Result<ReconcilePolicy, SettingsError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ReconcilePolicy::default()),
        Err(e) => return Err(io_error(path, e)),
    };
    let doc: toml::Table = toml::from_str(&contents).map_err(|e| SettingsError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;
    match doc.get("policy") {
        Some(policy) => policy
            .clone()
            .try_into()
            .map_err(|e| SettingsError::Parse {
                path: path.display().to_string(),
                source: e,
            }),
        None => Ok(ReconcilePolicy::default()),
    }
}

/// Save `policy` as the `[policy]` table of the settings file.
pub fn save_policy(policy: &ReconcilePolicy) -> Result<(), SettingsError> {
    save_policy_to(&settings_path(), policy)
}

/// Replace the `[policy]` table in `path`, keeping every other table.
///
/// An unparseable existing file is replaced.
pub fn save_policy_to(path: &Path, policy: &ReconcilePolicy) -> Result<(), SettingsError> {
    let mut doc: toml::Value = match std::fs::read_to_string(path) {
        Ok(contents) => contents.parse().unwrap_or_else(|e| {
            log::warn!("Replacing unreadable settings file {}: {}", path.display(), e);
            toml::Value::Table(Default::default())
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => toml::Value::Table(Default::default()),
        Err(e) => return Err(io_error(path, e)),
    };

    let table = doc
        .as_table_mut()
        .ok_or(SettingsError::NotATable("settings root"))?;
    table.insert("policy".to_string(), toml::Value::try_from(policy)?);

    // Write atomically
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let serialized = toml::to_string_pretty(&doc)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, &serialized).map_err(|e| io_error(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;

    log::debug!("Saved policy to {}", path.display());
    Ok(())
}

/// Load the full settings file as a pretty-printed TOML string for display.
pub fn load_settings_string() -> Option<String> {
    let contents = std::fs::read_to_string(settings_path()).ok()?;
    let doc: toml::Value = contents.parse().ok()?;
    toml::to_string_pretty(&doc).ok()
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
