use std::path::Path;

use shelf_core::*;
use shelf_reconcile::*;

fn releases() -> Vec<RawRow> {
    vec![
        RawRow::new("gog_1207658924")
            .secondary("witcher")
            .field(FieldName::Name, "The Witcher"),
        RawRow::new("gog_1495134320").field(FieldName::Name, "The Witcher 3"),
        RawRow::keyless().field(FieldName::Name, "Broken row"),
    ]
}

fn tags() -> Vec<RawRow> {
    vec![
        RawRow::new("gog_1207658924").field(FieldName::Tags, FieldValue::set_of(["rpg"])),
        RawRow::new("gog_1207658924").field(FieldName::Tags, FieldValue::set_of(["favorite"])),
    ]
}

fn details() -> Vec<RawRow> {
    vec![
        RawRow::new("gog_1207658924")
            .field(FieldName::Description, "Geralt's first outing")
            .field(FieldName::Name, "Witcher, The"),
        RawRow::new("gog_1207658924").field(FieldName::Description, "Second details row"),
    ]
}

#[test]
fn joins_aux_tables_onto_primary_rows() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Owned)
        .primary("library_releases", Some(releases()))
        .auxiliary(AuxTable::present("user_tags", JoinOn::Identifier, tags()))
        .auxiliary(AuxTable::present("game_details", JoinOn::Identifier, details()))
        .join(&mut normalizer);

    assert_eq!(batch.records.len(), 2);
    let witcher = &batch.records[0];
    assert_eq!(witcher.id.as_str(), "1207658924");
    assert_eq!(witcher.fields.set_of(FieldName::Tags).unwrap().len(), 2);
    // Primary value counts as the first match; first aux row wins after that.
    assert_eq!(witcher.fields.text(FieldName::Name), Some("The Witcher"));
    assert_eq!(
        witcher.fields.text(FieldName::Description),
        Some("Geralt's first outing")
    );

    // Zero matches leave fields unknown.
    let w3 = &batch.records[1];
    assert!(!w3.fields.contains(FieldName::Tags));
    assert!(!w3.fields.contains(FieldName::Description));

    assert_eq!(batch.errors.len(), 1);
    assert_eq!(
        batch.errors[0].to_string(),
        "missing identifier in source gog (table 'library_releases'), record #1"
    );
}

#[test]
fn fold_override_makes_later_rows_irrelevant() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Owned)
        .primary("library_releases", Some(releases()))
        .auxiliary(
            AuxTable::present("user_tags", JoinOn::Identifier, tags())
                .fold(FieldName::Tags, FoldRule::FirstWins),
        )
        .join(&mut normalizer);

    let tags = batch.records[0].fields.set_of(FieldName::Tags).unwrap();
    assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["rpg"]);
}

#[test]
fn joins_on_secondary_key() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Installed)
        .primary("installed_products", Some(vec![RawRow::new(5_i64)
            .secondary("Witcher")
            .field(FieldName::InstallPath, Path::new("/games/witcher"))]))
        .auxiliary(AuxTable::present(
            "play_tasks",
            JoinOn::SecondaryKey,
            vec![
                RawRow::new("witcher").field(FieldName::Executable, Path::new("witcher.exe")),
                RawRow::new("  ").field(FieldName::Executable, Path::new("orphan.exe")),
            ],
        ))
        .join(&mut normalizer);

    assert_eq!(
        batch.records[0].fields.path(FieldName::Executable),
        Some(Path::new("witcher.exe"))
    );
    assert_eq!(batch.errors.len(), 1);
    assert!(batch.errors[0].to_string().contains("table 'play_tasks'"));
}

#[test]
fn missing_primary_table_is_one_source_error() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Owned)
        .primary("library_releases", None)
        .auxiliary(AuxTable::present("user_tags", JoinOn::Identifier, tags()))
        .join(&mut normalizer);

    assert!(batch.records.is_empty());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].kind(), ErrorKind::SourceUnavailable);
}

#[test]
fn empty_primary_table_is_one_source_error() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Owned)
        .primary("library_releases", Some(Vec::new()))
        .join(&mut normalizer);

    assert!(batch.records.is_empty());
    assert_eq!(
        batch.errors[0].to_string(),
        "GOG Galaxy source unavailable: table 'library_releases' is empty"
    );
}

#[test]
fn missing_aux_table_degrades() {
    let mut normalizer = Normalizer::new();
    let batch = TableJoiner::new(SourceKind::Gog, SourceRole::Owned)
        .primary("library_releases", Some(releases()))
        .auxiliary(AuxTable::absent("user_tags", JoinOn::Identifier))
        .join(&mut normalizer);

    assert_eq!(batch.records.len(), 2);
    assert!(!batch.records[0].fields.contains(FieldName::Tags));
    // Only the keyless primary row is reported.
    assert_eq!(batch.errors.len(), 1);
}
