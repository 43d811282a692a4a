//! Owned/installed merge with disagreement detection.
//!
//! Installed records say what is on this machine; owned records say what the
//! user is entitled to. The two sides are keyed by canonical identifier, with a
//! secondary-key fallback for platforms that assign installation-time ids
//! independently of catalog ids. Field-level precedence follows each field's
//! [`MergeRule`]; every conflict the rule settles is counted and logged.

use std::collections::{HashMap, HashSet};

use shelf_core::{
    CanonicalEntity, FieldName, FieldValue, Fields, Identifier, InstallState, MatchMethod,
    MergeRule, RawRecord, ReconcileError, SecondaryKey, SourceRole,
};

use crate::progress::ReconcileProgress;

/// Counters collected while merging.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeStats {
    pub merged_primary: usize,
    pub merged_secondary: usize,
    pub owned_only: usize,
    pub installed_only: usize,
    pub duplicates: usize,
    pub invalid_paths: usize,
    /// Fields both sides knew with different values.
    pub conflicts: usize,
    pub annotations: usize,
    pub orphan_annotations: usize,
}

/// Canonical entities in emission order plus the problems found on the way.
#[derive(Debug, Default)]
pub struct MergeOutput {
    pub entities: Vec<CanonicalEntity>,
    pub errors: Vec<ReconcileError>,
    pub stats: MergeStats,
}

/// Compare the two sides' values for one field.
///
/// Returns `true` when both are known and differ. One side unknown is never a
/// conflict: the known value simply fills the gap.
pub fn check_field(
    id: &Identifier,
    field: FieldName,
    installed: Option<&FieldValue>,
    owned: Option<&FieldValue>,
) -> bool {
    let (Some(installed), Some(owned)) = (installed, owned) else {
        return false;
    };
    if installed == owned {
        return false;
    }
    log::debug!(
        "{}: '{}' differs (installed {:?}, owned {:?}), keeping the {} value",
        id,
        field,
        installed,
        owned,
        match field.merge_rule() {
            MergeRule::PreferOwned => "owned",
            MergeRule::PreferInstalled => "installed",
            MergeRule::Union => "combined",
        }
    );
    true
}

/// Resolve every field of a matched pair under its merge rule.
///
/// Returns the merged fields and the number of conflicting fields.
pub fn merge_fields(id: &Identifier, installed: Fields, owned: Fields) -> (Fields, usize) {
    let mut merged = Fields::new();
    let mut conflicts = 0;

    for &name in FieldName::all() {
        let left = installed.get(name);
        let right = owned.get(name);
        if name.merge_rule() != MergeRule::Union && check_field(id, name, left, right) {
            conflicts += 1;
        }

        let value = match (name.merge_rule(), left, right) {
            (_, None, None) => continue,
            (MergeRule::Union, Some(FieldValue::Set(a)), Some(FieldValue::Set(b))) => {
                FieldValue::Set(a.union(b).cloned().collect())
            }
            (MergeRule::PreferOwned, _, Some(v)) | (_, Some(v), _) | (_, None, Some(v)) => {
                v.clone()
            }
        };
        if let Err(e) = merged.set(name, value) {
            log::warn!("{}: {}", id, e);
        }
    }

    (merged, conflicts)
}

/// An installed record is only evidence of an installation when it says where.
fn has_valid_install_path(fields: &Fields) -> bool {
    match fields.path(FieldName::InstallPath) {
        Some(path) => {
            let text = path.to_string_lossy();
            !text.trim().is_empty() && !text.contains('\0')
        }
        None => false,
    }
}

fn owned_only_entity(record: RawRecord) -> CanonicalEntity {
    CanonicalEntity {
        id: record.id,
        aliases: Vec::new(),
        secondary_key: record.secondary_key,
        origin: record.origin,
        install_state: InstallState::OwnedNotInstalled,
        owned: true,
        fields: record.fields,
        parent: None,
        dependent: false,
        matched_by: None,
    }
}

fn installed_only_entity(record: RawRecord) -> CanonicalEntity {
    CanonicalEntity {
        id: record.id,
        aliases: Vec::new(),
        secondary_key: record.secondary_key,
        origin: record.origin,
        install_state: InstallState::Installed,
        owned: false,
        fields: record.fields,
        parent: None,
        dependent: false,
        matched_by: None,
    }
}

/// Merge one owned record with the installed record it matched.
fn merged_entity(
    owned: RawRecord,
    installed: RawRecord,
    method: MatchMethod,
    conflicts: &mut usize,
) -> CanonicalEntity {
    let (fields, found) = merge_fields(&owned.id, installed.fields, owned.fields);
    *conflicts += found;

    let aliases = if installed.id != owned.id {
        vec![installed.id]
    } else {
        Vec::new()
    };

    CanonicalEntity {
        id: owned.id,
        aliases,
        secondary_key: owned.secondary_key.or(installed.secondary_key),
        origin: owned.origin,
        install_state: InstallState::Installed,
        owned: true,
        fields,
        parent: None,
        dependent: false,
        matched_by: Some(method),
    }
}

/// Keep the first record per identifier; later ones become duplicate errors.
fn dedup(
    records: Vec<RawRecord>,
    role: SourceRole,
    errors: &mut Vec<ReconcileError>,
    stats: &mut MergeStats,
) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.id.clone()) {
            kept.push(record);
        } else {
            log::debug!("Duplicate {} record for {}", role, record.id);
            stats.duplicates += 1;
            errors.push(ReconcileError::DuplicateIdentifier {
                id: record.id,
                role,
            });
        }
    }
    kept
}

/// Merge records into canonical entities.
///
/// Records are routed by their own role. Entities come out as matched pairs
/// in owned order, then owned-only entities, then installed-only entities.
/// Hidden flags and relationship hints are applied last.
pub fn merge_records<I>(records: I, progress: Option<&dyn ReconcileProgress>) -> MergeOutput
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut out = MergeOutput::default();
    let mut installed = Vec::new();
    let mut owned = Vec::new();
    let mut annotations = Vec::new();

    for record in records {
        match record.role {
            role if role.is_annotation() => annotations.push(record),
            SourceRole::Installed => installed.push(record),
            _ => owned.push(record),
        }
    }

    // The first installed record per id wins even when it turns out to be pathless.
    let installed: Vec<RawRecord> =
        dedup(installed, SourceRole::Installed, &mut out.errors, &mut out.stats)
            .into_iter()
            .filter_map(|record| {
                if has_valid_install_path(&record.fields) {
                    return Some(record);
                }
                out.stats.invalid_paths += 1;
                out.errors
                    .push(ReconcileError::InvalidInstallPath { id: record.id });
                None
            })
            .collect();
    let owned = dedup(owned, SourceRole::Owned, &mut out.errors, &mut out.stats);

    let installed_by_key: HashMap<&Identifier, usize> = installed
        .iter()
        .enumerate()
        .map(|(i, r)| (&r.id, i))
        .collect();

    // Pass 1: primary identifier matches.
    let mut consumed = vec![false; installed.len()];
    let mut matches: Vec<Option<(usize, MatchMethod)>> = vec![None; owned.len()];
    for (o, record) in owned.iter().enumerate() {
        if let Some(&i) = installed_by_key.get(&record.id) {
            consumed[i] = true;
            matches[o] = Some((i, MatchMethod::Primary));
        }
    }

    // Pass 2: secondary keys, only where exactly one unconsumed installed record carries the key.
    let mut installed_by_secondary: HashMap<&SecondaryKey, Vec<usize>> = HashMap::new();
    for (i, record) in installed.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        if let Some(key) = &record.secondary_key {
            installed_by_secondary.entry(key).or_default().push(i);
        }
    }
    for (o, record) in owned.iter().enumerate() {
        if matches[o].is_some() {
            continue;
        }
        let Some(key) = &record.secondary_key else {
            continue;
        };
        let candidates: Vec<usize> = installed_by_secondary
            .get(key)
            .map(|c| c.iter().copied().filter(|&i| !consumed[i]).collect())
            .unwrap_or_default();
        match candidates.as_slice() {
            [i] => {
                consumed[*i] = true;
                matches[o] = Some((*i, MatchMethod::Secondary));
            }
            [] => {}
            _ => log::debug!(
                "{}: secondary key '{}' is shared by {} installed records, not merging",
                record.id,
                key,
                candidates.len()
            ),
        }
    }

    let total = owned.len() + consumed.iter().filter(|c| !**c).count();
    let mut installed: Vec<Option<RawRecord>> = installed.into_iter().map(Some).collect();
    let mut owned_only = Vec::new();

    for (record, matched) in owned.into_iter().zip(matches) {
        let pair = matched.and_then(|(i, method)| installed[i].take().map(|r| (r, method)));
        match pair {
            Some((installed_record, method)) => {
                match method {
                    MatchMethod::Primary => out.stats.merged_primary += 1,
                    MatchMethod::Secondary => out.stats.merged_secondary += 1,
                }
                let entity =
                    merged_entity(record, installed_record, method, &mut out.stats.conflicts);
                report(progress, out.entities.len() + 1, total, &entity);
                out.entities.push(entity);
            }
            None => owned_only.push(record),
        }
    }

    for record in owned_only {
        out.stats.owned_only += 1;
        let entity = owned_only_entity(record);
        report(progress, out.entities.len() + 1, total, &entity);
        out.entities.push(entity);
    }

    for record in installed.into_iter().flatten() {
        out.stats.installed_only += 1;
        let entity = installed_only_entity(record);
        report(progress, out.entities.len() + 1, total, &entity);
        out.entities.push(entity);
    }

    apply_annotations(&mut out, annotations);
    out
}

fn report(progress: Option<&dyn ReconcileProgress>, current: usize, total: usize, entity: &CanonicalEntity) {
    if let Some(p) = progress {
        p.on_entity(current, total, &entity.label());
    }
}

/// Overlay hidden flags and relationship hints onto the entities they name.
fn apply_annotations(out: &mut MergeOutput, annotations: Vec<RawRecord>) {
    if annotations.is_empty() {
        return;
    }

    let mut by_id: HashMap<Identifier, usize> = HashMap::new();
    for (i, entity) in out.entities.iter().enumerate() {
        by_id.entry(entity.id.clone()).or_insert(i);
        for alias in &entity.aliases {
            by_id.entry(alias.clone()).or_insert(i);
        }
    }

    for record in annotations {
        let Some(&i) = by_id.get(&record.id) else {
            out.stats.orphan_annotations += 1;
            out.errors.push(ReconcileError::OrphanAnnotation {
                id: record.id,
                role: record.role,
            });
            continue;
        };
        out.stats.annotations += 1;
        let allowed = annotation_fields(record.role);
        let entity = &mut out.entities[i];
        for (name, value) in record.fields {
            if !allowed.contains(&name) {
                out.errors.push(ReconcileError::malformed(
                    record.origin,
                    format!("{} ({})", record.id, record.role),
                    format!("field '{}' cannot be set by a {} record", name, record.role),
                ));
                continue;
            }
            if let Err(e) = entity.fields.set(name, value) {
                log::warn!("{}: {}", entity.id, e);
            }
        }
    }
}

/// Fields an annotation may set. Everything else belongs to the installed and
/// owned sides and their merge rules.
fn annotation_fields(role: SourceRole) -> &'static [FieldName] {
    match role {
        SourceRole::HiddenFlag => &[FieldName::Hidden],
        SourceRole::RelationshipHint => &[FieldName::ParentRef, FieldName::DependentHint],
        SourceRole::Installed | SourceRole::Owned => &[],
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use shelf_core::{RawRow, SourceKind};

    use super::*;

    fn record(key: &str, role: SourceRole, fields: Fields) -> RawRecord {
        RawRecord {
            id: Identifier::parse(key, SourceKind::Local).unwrap(),
            secondary_key: None,
            origin: SourceKind::Local,
            role,
            fields,
        }
    }

    fn id(key: &str) -> Identifier {
        Identifier::parse(key, SourceKind::Local).unwrap()
    }

    #[test]
    fn check_field_ignores_unknown_side() {
        let a = FieldValue::from("A");
        let b = FieldValue::from("B");
        assert!(!check_field(&id("1"), FieldName::Name, None, None));
        assert!(!check_field(&id("1"), FieldName::Name, Some(&a), None));
        assert!(!check_field(&id("1"), FieldName::Name, None, Some(&b)));
        assert!(!check_field(&id("1"), FieldName::Name, Some(&a), Some(&a)));
        assert!(check_field(&id("1"), FieldName::Name, Some(&a), Some(&b)));
    }

    #[test]
    fn merge_fields_follows_rules() {
        let installed = Fields::new()
            .with(FieldName::Name, "Foo (local)")
            .with(FieldName::InstallPath, Path::new("/games/foo"))
            .with(FieldName::Description, "stale")
            .with(FieldName::Tags, FieldValue::set_of(["fav"]));
        let owned = Fields::new()
            .with(FieldName::Name, "Foo")
            .with(FieldName::InstallPath, Path::new("/elsewhere"))
            .with(FieldName::Description, "Foo Game")
            .with(FieldName::Publisher, "Acme")
            .with(FieldName::Tags, FieldValue::set_of(["rpg"]));

        let (merged, conflicts) = merge_fields(&id("1"), installed, owned);
        assert_eq!(merged.text(FieldName::Name), Some("Foo (local)"));
        assert_eq!(merged.path(FieldName::InstallPath), Some(Path::new("/games/foo")));
        assert_eq!(merged.text(FieldName::Description), Some("Foo Game"));
        assert_eq!(merged.text(FieldName::Publisher), Some("Acme"));
        assert_eq!(merged.set_of(FieldName::Tags).unwrap().len(), 2);
        assert_eq!(conflicts, 3);
    }

    #[test]
    fn missing_install_path_is_not_installation_evidence() {
        let out = merge_records(
            vec![
                record("1", SourceRole::Installed, Fields::new()),
                record("1", SourceRole::Owned, Fields::new().with(FieldName::Name, "Foo")),
            ],
            None,
        );
        assert_eq!(out.entities.len(), 1);
        assert_eq!(out.entities[0].install_state, InstallState::OwnedNotInstalled);
        assert!(matches!(
            out.errors[0],
            ReconcileError::InvalidInstallPath { .. }
        ));
    }

    #[test]
    fn orphan_annotation_is_reported() {
        let out = merge_records(
            vec![
                record("1", SourceRole::Owned, Fields::new()),
                record("2", SourceRole::HiddenFlag, Fields::new().with(FieldName::Hidden, true)),
                record("1", SourceRole::HiddenFlag, Fields::new().with(FieldName::Hidden, true)),
            ],
            None,
        );
        assert!(out.entities[0].is_hidden());
        assert_eq!(out.stats.orphan_annotations, 1);
        assert_eq!(
            out.errors[0].to_string(),
            "hidden-flag record for 2 matches no entity"
        );
    }

    #[test]
    fn raw_row_builder_feeds_merge() {
        let mut normalizer = shelf_core::Normalizer::new();
        let batch = normalizer.normalize_rows(
            vec![RawRow::new("9").field(FieldName::InstallPath, Path::new("/g/9"))],
            SourceKind::Local,
            SourceRole::Installed,
        );
        let out = merge_records(batch.records, None);
        assert_eq!(out.stats.installed_only, 1);
        assert!(!out.entities[0].owned);
    }
}
