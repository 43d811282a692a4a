pub(crate) mod config;
pub(crate) mod reconcile;
pub(crate) mod run;
pub(crate) mod sources;

use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;
use shelf_core::{
    CanonicalEntity, ErrorKind, FieldName, Outcome, ParentStatus, ReconcileError,
    ReconcilePolicy,
};
use shelf_reconcile::ReconcileStats;

use crate::CliError;
use crate::cli_types::PolicyArgs;

/// Saved default policy with the command-line flags layered on top.
pub(crate) fn effective_policy(args: &PolicyArgs) -> Result<ReconcilePolicy, CliError> {
    let saved = shelf_lib::load_policy()?;
    Ok(args.apply(saved))
}

fn kind_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::SourceUnavailable => "source_unavailable",
        ErrorKind::RecordMalformed => "record_malformed",
        ErrorKind::DuplicateIdentifier => "duplicate_identifier",
        ErrorKind::PolicyExcluded => "policy_excluded",
    }
}

/// One outcome as a JSON object: `{"entity": ...}` or `{"error": ...}`.
pub(crate) fn outcome_json(
    outcome: &Outcome,
    pipeline: Option<&str>,
) -> Result<String, CliError> {
    let mut value = match outcome {
        Outcome::Entity(entity) => serde_json::json!({ "entity": entity }),
        Outcome::Error(e) => serde_json::json!({
            "error": { "kind": kind_name(e.kind()), "message": e.to_string() }
        }),
    };
    if let Some(name) = pipeline {
        value["pipeline"] = serde_json::Value::from(name);
    }
    Ok(serde_json::to_string(&value)?)
}

fn entity_line(entity: &CanonicalEntity) -> String {
    let state = if entity.is_installed() {
        "installed".if_supports_color(Stdout, |t| t.green()).to_string()
    } else {
        "owned".if_supports_color(Stdout, |t| t.dimmed()).to_string()
    };
    let mut line = format!(
        "{} {} [{}]",
        entity
            .name()
            .unwrap_or("(unnamed)")
            .if_supports_color(Stdout, |t| t.bold()),
        entity.id.if_supports_color(Stdout, |t| t.cyan()),
        state,
    );
    if let Some(path) = entity.install_path() {
        line.push_str(&format!(" {}", path.display()));
    }
    if let Some(played) = entity.fields.timestamp(FieldName::LastPlayed) {
        line.push_str(&format!(" (last played {})", played.format("%Y-%m-%d")));
    }
    if let Some(parent) = &entity.parent {
        let status = match parent.status {
            ParentStatus::Resolved => String::new(),
            ParentStatus::Dangling => " (not in library)".to_string(),
            ParentStatus::Cyclic => " (cycle)".to_string(),
        };
        line.push_str(&format!(
            "\n      DLC of {}{}",
            parent.id.if_supports_color(Stdout, |t| t.cyan()),
            status.if_supports_color(Stdout, |t| t.yellow()),
        ));
    } else if entity.dependent {
        line.push_str(&format!(
            "\n      {}",
            "DLC, base game unknown".if_supports_color(Stdout, |t| t.yellow())
        ));
    }
    line
}

fn error_line(error: &ReconcileError) -> String {
    match error.kind() {
        ErrorKind::PolicyExcluded => format!(
            "{} {}",
            "-".if_supports_color(Stdout, |t| t.dimmed()),
            error.if_supports_color(Stdout, |t| t.dimmed()),
        ),
        ErrorKind::SourceUnavailable => format!(
            "{} {}",
            "\u{2717}".if_supports_color(Stdout, |t| t.red()),
            error,
        ),
        ErrorKind::RecordMalformed | ErrorKind::DuplicateIdentifier => format!(
            "{} {}",
            "\u{26A0}".if_supports_color(Stdout, |t| t.yellow()),
            error,
        ),
    }
}

/// Human-readable rendering of one outcome.
pub(crate) fn outcome_line(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Entity(entity) => format!("  {}", entity_line(entity)),
        Outcome::Error(e) => format!("  {}", error_line(e)),
    }
}

pub(crate) fn log_stats(stats: &ReconcileStats) {
    log::info!(
        "  Entities:       {:>6} ({} merged by id, {} by secondary key)",
        stats.entities,
        stats.merged_primary,
        stats.merged_secondary,
    );
    log::info!("  Owned only:     {:>6}", stats.owned_only);
    log::info!("  Installed only: {:>6}", stats.installed_only);
    log::info!(
        "  DLC:            {:>6} ({} dangling, {} in cycles)",
        stats.dependents,
        stats.dangling,
        stats.cycles,
    );
    log::info!("  Conflicts:      {:>6}", stats.conflicts);
    log::info!("  Excluded:       {:>6}", stats.excluded);
    if stats.errors > 0 {
        log::warn!(
            "  Errors:         {:>6} ({} duplicates)",
            stats.errors,
            stats.duplicates,
        );
    }
}
