use std::fs;
use std::path::Path;

use shelf_core::*;
use shelf_snapshot::*;
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

const OWNED_YAML: &str = r#"
source: gog
role: owned
records:
  - key: gog_1207658924
    secondary: Witcher
    fields:
      name: The Witcher
      genres: [RPG, Action]
      release_date: "2007-10-26"
      rating: 4
  - key: gog_1207665503
    fields:
      name: The Witcher Soundtrack
      parent_ref: gog_1207658924
  - fields:
      name: No key at all
"#;

#[test]
fn load_flat_yaml_snapshot() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "owned.yaml", OWNED_YAML);

    let snapshot = load_snapshot(&tmp.path().join("owned.yaml")).unwrap();
    assert_eq!(snapshot.source, SourceKind::Gog);
    assert_eq!(snapshot.role, SourceRole::Owned);
    assert_eq!(snapshot.records.len(), 3);

    let mut ctx = RunContext::new();
    let batch = snapshot.into_batch(&mut ctx);
    assert_eq!(batch.records.len(), 2);
    let witcher = &batch.records[0];
    assert_eq!(witcher.id.as_str(), "1207658924");
    assert_eq!(witcher.secondary_key.as_ref().unwrap().as_str(), "witcher");
    assert_eq!(witcher.fields.float(FieldName::Rating), Some(4.0));
    assert_eq!(witcher.fields.set_of(FieldName::Genres).unwrap().len(), 2);
    assert!(witcher.fields.timestamp(FieldName::ReleaseDate).is_some());

    assert_eq!(batch.errors.len(), 1);
    assert_eq!(
        batch.errors[0].to_string(),
        "missing identifier in source gog, record #1"
    );
}

#[test]
fn load_json_snapshot() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "installed.json",
        r#"{
            "source": "steam",
            "role": "installed",
            "records": [
                {"key": "appmanifest_440.acf", "fields": {"install_path": "/steam/tf2", "install_size": 1024}},
                {"key": 570, "fields": {"install_path": "/steam/dota"}}
            ]
        }"#,
    );

    let mut ctx = RunContext::new();
    let batch = batch_from_file(
        &tmp.path().join("installed.json"),
        SourceKind::Steam,
        SourceRole::Installed,
        &mut ctx,
    );
    assert!(batch.errors.is_empty());
    let ids: Vec<&str> = batch.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["440", "570"]);
    assert_eq!(batch.records[0].fields.integer(FieldName::InstallSize), Some(1024));
}

#[test]
fn unknown_field_name_is_a_parse_error() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "owned.yaml",
        "source: gog\nrole: owned\nrecords:\n  - key: 1\n    fields:\n      nmae: Typo\n",
    );

    let err = load_snapshot(&tmp.path().join("owned.yaml")).unwrap_err();
    assert!(matches!(err, SnapshotError::Yaml { .. }));
}

#[test]
fn mistyped_value_is_a_record_error() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "installed.yaml",
        r#"
source: local
role: installed
records:
  - key: foo
    fields:
      install_path: /games/foo
      install_size: lots
"#,
    );

    let mut ctx = RunContext::new();
    let batch = batch_from_file(
        &tmp.path().join("installed.yaml"),
        SourceKind::Local,
        SourceRole::Installed,
        &mut ctx,
    );
    assert_eq!(batch.records.len(), 1);
    assert!(!batch.records[0].fields.contains(FieldName::InstallSize));
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].kind(), ErrorKind::RecordMalformed);
    assert!(batch.errors[0].to_string().contains("record 'foo'"));
}

#[test]
fn multi_table_snapshot_is_joined() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "owned.yaml",
        r#"
source: epic
role: owned
tables:
  primary:
    name: catalog_items
    rows:
      - key: Fortnite
        secondary: fn
        fields: { name: Fortnite }
      - key: Sugar
        fields: { name: Rocket League }
  auxiliary:
    - name: tags
      rows:
        - { key: Fortnite, fields: { tags: [shooter] } }
        - { key: Fortnite, fields: { tags: [free] } }
    - name: namespaces
      join_on: secondary_key
      rows:
        - { key: FN, fields: { publisher: Epic Games } }
    - name: ratings
"#,
    );

    let mut ctx = RunContext::new();
    let batch = batch_from_file(
        &tmp.path().join("owned.yaml"),
        SourceKind::Epic,
        SourceRole::Owned,
        &mut ctx,
    );
    assert!(batch.errors.is_empty());
    assert_eq!(batch.records.len(), 2);
    let fortnite = &batch.records[0];
    assert_eq!(fortnite.fields.set_of(FieldName::Tags).unwrap().len(), 2);
    assert_eq!(fortnite.fields.text(FieldName::Publisher), Some("Epic Games"));
    assert!(!batch.records[1].fields.contains(FieldName::Tags));
}

#[test]
fn records_and_tables_together_are_rejected() {
    let tmp = TempDir::new().unwrap();
    write_file(
        tmp.path(),
        "owned.yaml",
        r#"
source: local
role: owned
records:
  - key: a
tables:
  primary:
    name: t
    rows: []
"#,
    );
    let err = load_snapshot(&tmp.path().join("owned.yaml")).unwrap_err();
    assert!(matches!(err, SnapshotError::Layout(_)));
}

#[test]
fn missing_file_becomes_source_error() {
    let tmp = TempDir::new().unwrap();
    let mut ctx = RunContext::new();
    let batch = batch_from_file(
        &tmp.path().join("installed.yaml"),
        SourceKind::Local,
        SourceRole::Installed,
        &mut ctx,
    );
    assert!(batch.records.is_empty());
    assert_eq!(batch.errors.len(), 1);
    assert_eq!(batch.errors[0].kind(), ErrorKind::SourceUnavailable);
}

#[test]
fn wrong_source_becomes_source_error() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "owned.yaml", OWNED_YAML);
    let mut ctx = RunContext::new();
    let batch = batch_from_file(
        &tmp.path().join("owned.yaml"),
        SourceKind::Steam,
        SourceRole::Owned,
        &mut ctx,
    );
    assert!(batch.records.is_empty());
    assert!(batch.errors[0].to_string().contains("holds gog owned records"));
}

#[test]
fn load_dir_sorted_and_filtered() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "b.yaml", "source: local\nrole: owned\n");
    write_file(tmp.path(), "a.json", r#"{"source": "local", "role": "installed"}"#);
    write_file(tmp.path(), "notes.txt", "not a snapshot");

    let snapshots = load_snapshot_dir(tmp.path()).unwrap();
    let names: Vec<String> = snapshots
        .iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.json", "b.yaml"]);
    assert_eq!(snapshots[0].1.role, SourceRole::Installed);
}

#[test]
fn load_missing_dir_returns_empty() {
    let snapshots = load_snapshot_dir(Path::new("/nonexistent/path/snapshots")).unwrap();
    assert!(snapshots.is_empty());
}

#[test]
fn find_snapshot_tries_each_extension() {
    let tmp = TempDir::new().unwrap();
    write_file(tmp.path(), "owned.yml", "source: local\nrole: owned\n");
    assert_eq!(
        find_snapshot(tmp.path(), "owned"),
        Some(tmp.path().join("owned.yml"))
    );
    assert_eq!(find_snapshot(tmp.path(), "installed"), None);
}
