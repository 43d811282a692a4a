use std::collections::BTreeMap;
use std::path::Path;

use shelf_core::*;
use shelf_reconcile::*;

fn batch(origin: SourceKind, role: SourceRole, rows: Vec<RawRow>) -> RecordBatch {
    Normalizer::new().normalize_rows(rows, origin, role)
}

fn installed(rows: Vec<RawRow>) -> RecordBatch {
    batch(SourceKind::Local, SourceRole::Installed, rows)
}

fn owned(rows: Vec<RawRow>) -> RecordBatch {
    batch(SourceKind::Local, SourceRole::Owned, rows)
}

fn at(key: &str, path: &str) -> RawRow {
    RawRow::new(key).field(FieldName::InstallPath, Path::new(path))
}

fn split(stream: OutcomeStream) -> (Vec<CanonicalEntity>, Vec<ReconcileError>) {
    let mut entities = Vec::new();
    let mut errors = Vec::new();
    for outcome in stream {
        match outcome {
            Outcome::Entity(e) => entities.push(e),
            Outcome::Error(e) => errors.push(e),
        }
    }
    (entities, errors)
}

fn run(
    installed: RecordBatch,
    owned: RecordBatch,
    policy: &ReconcilePolicy,
) -> (Vec<CanonicalEntity>, Vec<ReconcileError>) {
    split(reconcile(installed, owned, policy).unwrap())
}

#[test]
fn installed_and_owned_merge_into_one_entity() {
    let (entities, errors) = run(
        installed(vec![at("42", "/games/foo")]),
        owned(vec![RawRow::new("42")
            .field(FieldName::Description, "Foo Game")
            .field(FieldName::Genres, FieldValue::set_of(["Action"]))]),
        &ReconcilePolicy::default(),
    );

    assert!(errors.is_empty());
    assert_eq!(entities.len(), 1);
    let foo = &entities[0];
    assert_eq!(foo.id.as_str(), "42");
    assert_eq!(foo.install_state, InstallState::Installed);
    assert_eq!(foo.install_path(), Some(Path::new("/games/foo")));
    assert_eq!(foo.fields.text(FieldName::Description), Some("Foo Game"));
    assert_eq!(
        foo.fields.set_of(FieldName::Genres).unwrap().iter().collect::<Vec<_>>(),
        vec!["Action"]
    );
    assert_eq!(foo.matched_by, Some(MatchMethod::Primary));
}

#[test]
fn owned_without_installation() {
    let (entities, errors) = run(
        installed(vec![]),
        owned(vec![RawRow::new("7").field(FieldName::Name, "Bar")]),
        &ReconcilePolicy::default(),
    );

    assert!(errors.is_empty());
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id.as_str(), "7");
    assert_eq!(entities[0].install_state, InstallState::OwnedNotInstalled);
}

#[test]
fn dangling_parent_is_kept_without_error() {
    let (entities, errors) = run(
        installed(vec![]),
        owned(vec![RawRow::new("5").field(FieldName::ParentRef, "1")]),
        &ReconcilePolicy::default(),
    );

    assert!(errors.is_empty());
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id.as_str(), "5");
    assert_eq!(entities[0].parent_id().unwrap().as_str(), "1");
    assert_eq!(
        entities[0].parent.as_ref().unwrap().status,
        ParentStatus::Dangling
    );
}

#[test]
fn installed_path_always_wins() {
    let (entities, _) = run(
        installed(vec![at("1", "/local/path")]),
        owned(vec![RawRow::new("1").field(FieldName::InstallPath, Path::new("/catalog/path"))]),
        &ReconcilePolicy::default(),
    );
    assert_eq!(entities[0].install_path(), Some(Path::new("/local/path")));
}

#[test]
fn conflicting_names_prefer_installed_and_are_counted() {
    let stream = reconcile(
        installed(vec![at("1", "/g/1").field(FieldName::Name, "Local Name")]),
        owned(vec![RawRow::new("1").field(FieldName::Name, "Store Name")]),
        &ReconcilePolicy::default(),
    )
    .unwrap();
    assert_eq!(stream.stats().conflicts, 1);

    let (entities, _) = split(stream);
    assert_eq!(entities[0].name(), Some("Local Name"));
}

#[test]
fn duplicate_installed_rows_yield_one_entity_and_one_error() {
    let (entities, errors) = run(
        installed(vec![at("3", "/first"), at("3", "/second")]),
        owned(vec![]),
        &ReconcilePolicy::default(),
    );

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].install_path(), Some(Path::new("/first")));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::DuplicateIdentifier);
    assert_eq!(
        errors[0].to_string(),
        "duplicate entry for identifier 3 (installed records)"
    );
}

#[test]
fn base_only_excludes_dependent_with_one_message() {
    let (entities, errors) = run(
        installed(vec![]),
        owned(vec![
            RawRow::new("1").field(FieldName::Name, "Foo"),
            RawRow::new("2")
                .field(FieldName::Name, "Foo: Soundtrack")
                .field(FieldName::ParentRef, "1"),
        ]),
        &ReconcilePolicy::new().base_only(true),
    );

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].id.as_str(), "1");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::PolicyExcluded);
    assert_eq!(
        errors[0].to_string(),
        "Foo: Soundtrack (2) is a DLC, excluded by policy"
    );
}

#[test]
fn emission_order_is_merged_then_owned_only_then_installed_only() {
    let (entities, _) = run(
        installed(vec![at("i1", "/i1"), at("m2", "/m2"), at("m1", "/m1")]),
        owned(vec![
            RawRow::new("o1"),
            RawRow::new("m1"),
            RawRow::new("o2"),
            RawRow::new("m2"),
        ]),
        &ReconcilePolicy::default(),
    );

    let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "o1", "o2", "i1"]);
}

#[test]
fn errors_precede_entities() {
    let (installed_batch, owned_batch) = (
        installed(vec![RawRow::keyless(), at("1", "/g/1")]),
        owned(vec![RawRow::new("1"), RawRow::new("1")]),
    );
    let outcomes: Vec<Outcome> = reconcile(installed_batch, owned_batch, &ReconcilePolicy::default())
        .unwrap()
        .collect();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].error().unwrap().kind(), ErrorKind::RecordMalformed);
    assert_eq!(outcomes[1].error().unwrap().kind(), ErrorKind::DuplicateIdentifier);
    assert!(outcomes[2].is_entity());
}

#[test]
fn secondary_key_recovers_diverging_ids() {
    let (entities, errors) = run(
        installed(vec![at("install-77", "/games/baz").secondary("baz")]),
        owned(vec![RawRow::new("catalog-9").secondary("BAZ").field(FieldName::Name, "Baz")]),
        &ReconcilePolicy::default(),
    );

    assert!(errors.is_empty());
    assert_eq!(entities.len(), 1);
    let baz = &entities[0];
    assert_eq!(baz.id.as_str(), "catalog-9");
    assert_eq!(baz.aliases[0].as_str(), "install-77");
    assert_eq!(baz.matched_by, Some(MatchMethod::Secondary));
    assert!(baz.is_installed());
}

#[test]
fn shared_secondary_key_does_not_merge() {
    let (entities, _) = run(
        installed(vec![
            at("a", "/games/a").secondary("ns"),
            at("b", "/games/b").secondary("ns"),
        ]),
        owned(vec![RawRow::new("c").secondary("ns")]),
        &ReconcilePolicy::default(),
    );

    assert_eq!(entities.len(), 3);
    assert!(entities.iter().all(|e| e.matched_by.is_none()));
}

#[test]
fn hidden_flags_filter_unless_included() {
    let mut flags = batch(
        SourceKind::Local,
        SourceRole::HiddenFlag,
        vec![RawRow::new("2").field(FieldName::Hidden, true)],
    );
    let mut owned_batch = owned(vec![RawRow::new("1"), RawRow::new("2")]);
    owned_batch.records.append(&mut flags.records);

    let (entities, errors) = run(installed(vec![]), owned_batch, &ReconcilePolicy::default());
    assert_eq!(entities.len(), 1);
    assert_eq!(errors[0].to_string(), "2 is hidden, excluded by policy");
}

#[test]
fn relationship_hints_only_set_relationship_fields() {
    let mut hints = batch(
        SourceKind::Local,
        SourceRole::RelationshipHint,
        vec![RawRow::new("1")
            .field(FieldName::InstallPath, Path::new("/hint/path"))
            .field(FieldName::Name, "Hint Name")
            .field(FieldName::ParentRef, "9")],
    );
    let mut owned_batch = owned(vec![RawRow::new("1").field(FieldName::Name, "Foo")]);
    owned_batch.records.append(&mut hints.records);

    let (entities, errors) = run(
        installed(vec![at("1", "/games/foo")]),
        owned_batch,
        &ReconcilePolicy::default(),
    );

    assert_eq!(entities.len(), 1);
    let foo = &entities[0];
    assert_eq!(foo.install_path(), Some(Path::new("/games/foo")));
    assert_eq!(foo.name(), Some("Foo"));
    assert_eq!(foo.parent_id().map(Identifier::as_str), Some("9"));

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.kind() == ErrorKind::RecordMalformed));
    assert!(errors.iter().any(|e| e.to_string().contains("install_path")));
}

#[test]
fn hidden_flags_cannot_rename_entities() {
    let mut flags = batch(
        SourceKind::Local,
        SourceRole::HiddenFlag,
        vec![RawRow::new("1")
            .field(FieldName::Hidden, true)
            .field(FieldName::Name, "Renamed")],
    );
    let mut owned_batch = owned(vec![RawRow::new("1").field(FieldName::Name, "Foo")]);
    owned_batch.records.append(&mut flags.records);

    let (entities, errors) = run(
        installed(vec![]),
        owned_batch,
        &ReconcilePolicy::new().include_hidden(true),
    );

    assert!(entities[0].is_hidden());
    assert_eq!(entities[0].name(), Some("Foo"));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::RecordMalformed);
}

#[test]
fn pathless_first_installed_row_still_wins_over_duplicate() {
    let (entities, errors) = run(
        installed(vec![RawRow::new("3"), at("3", "/second")]),
        owned(vec![]),
        &ReconcilePolicy::default(),
    );

    assert!(entities.is_empty());
    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors
            .iter()
            .filter(|e| e.kind() == ErrorKind::DuplicateIdentifier)
            .count(),
        1
    );
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ReconcileError::InvalidInstallPath { .. }))
    );
}

#[test]
fn source_level_failure_still_merges_other_side() {
    let (entities, errors) = run(
        RecordBatch::unavailable(SourceKind::Local, SourceRole::Installed, "installed.yaml not found"),
        owned(vec![RawRow::new("1")]),
        &ReconcilePolicy::default(),
    );

    assert_eq!(entities.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind(), ErrorKind::SourceUnavailable);
}

#[test]
fn mismatched_sources_are_a_hard_failure() {
    let result = reconcile(
        RecordBatch::empty(SourceKind::Steam, SourceRole::Installed),
        RecordBatch::empty(SourceKind::Gog, SourceRole::Owned),
        &ReconcilePolicy::default(),
    );
    assert!(matches!(result, Err(PipelineError::SourceMismatch { .. })));
}

#[test]
fn no_silent_loss() {
    let installed_rows = vec![at("1", "/1"), at("2", "/2"), at("3", "/3")];
    let owned_rows = vec![RawRow::new("2"), RawRow::new("4"), RawRow::new("5")];
    let (entities, errors) = run(
        installed(installed_rows),
        owned(owned_rows),
        &ReconcilePolicy::default(),
    );

    assert!(errors.is_empty());
    assert_eq!(entities.len(), 5);
}

#[test]
fn disjoint_inputs_reconcile_independently() {
    let a = || vec![at("1", "/1"), at("2", "/2")];
    let b = || vec![RawRow::new("3").field(FieldName::Name, "Three"), RawRow::new("4")];
    let policy = ReconcilePolicy::default();

    let (only_a, _) = run(installed(a()), owned(vec![]), &policy);
    let (only_b, _) = run(installed(vec![]), owned(b()), &policy);
    let mut separately: BTreeMap<String, CanonicalEntity> = BTreeMap::new();
    for e in only_a.into_iter().chain(only_b) {
        separately.insert(e.id.to_string(), e);
    }

    let (together, _) = run(installed(a()), owned(b()), &policy);
    let together: BTreeMap<String, CanonicalEntity> = together
        .into_iter()
        .map(|e| (e.id.to_string(), e))
        .collect();

    assert_eq!(separately, together);
}

#[test]
fn stats_track_exclusions_as_consumed() {
    let mut stream = reconcile(
        installed(vec![]),
        owned(vec![RawRow::new("1"), RawRow::new("2")]),
        &ReconcilePolicy::new().installed_only(true),
    )
    .unwrap();

    assert_eq!(stream.stats().entities, 2);
    assert_eq!(stream.stats().excluded, 0);
    stream.next();
    assert_eq!(stream.stats().excluded, 1);
    stream.next();
    assert_eq!(stream.stats().excluded, 2);
    assert!(stream.next().is_none());
}
