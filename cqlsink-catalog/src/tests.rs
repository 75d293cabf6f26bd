use expect_test::expect;

use crate::*;

fn catalog() -> MemCatalog {
    let mut catalog = MemCatalog::new();
    catalog.create_table(
        "Sink",
        "Events",
        [
            Column::new("id", LogicalType::BigInt),
            Column::new("Name", LogicalType::Text),
            Column::new("created", LogicalType::Timestamp),
        ],
    );
    catalog
}

#[test]
fn load_schema_preserves_catalog_order() {
    let schema = load_schema(&catalog(), "sink", "events").unwrap();
    expect!["sink.events (id bigint, Name text, created timestamp)"]
        .assert_eq(&schema.to_string());
    assert_eq!(schema.len(), 3);
    assert_eq!(schema.position("name"), Some(1));
    assert_eq!(schema.get("created").map(Column::logical_type), Some(&LogicalType::Timestamp));
    assert!(!schema.contains("Name"), "lookup keys are lowercase");
}

#[test]
fn missing_keyspace_or_table() {
    let catalog = catalog();
    let err = load_schema(&catalog, "nope", "events").unwrap_err();
    expect!["keyspace `nope` not found"].assert_eq(&err.to_string());

    let err = load_schema(&catalog, "sink", "nope").unwrap_err();
    expect!["table `sink.nope` not found"].assert_eq(&err.to_string());
}

#[test]
fn empty_table_is_rejected() {
    let mut catalog = catalog();
    catalog.create_table("sink", "empty", []);
    let err = load_schema(&catalog, "sink", "empty").unwrap_err();
    assert!(matches!(err, Error::EmptySchema { .. }));
}

#[test]
fn schema_changes_are_visible_on_the_next_load() {
    let mut catalog = catalog();
    assert_eq!(load_schema(&catalog, "sink", "events").unwrap().len(), 3);

    catalog.add_column("sink", "events", Column::new("nickname", LogicalType::Varchar)).unwrap();
    let schema = load_schema(&catalog, "sink", "events").unwrap();
    assert_eq!(schema.position("nickname"), Some(3));

    catalog.drop_table("sink", "events").unwrap();
    assert!(matches!(
        load_schema(&catalog, "sink", "events"),
        Err(Error::SchemaNotFound { kind: "table", .. })
    ));
}

#[test]
fn case_colliding_columns_resolve_to_the_first() {
    let schema = TableSchema::new(
        "ks",
        "t",
        vec![Column::new("Id", LogicalType::Int), Column::new("id", LogicalType::BigInt)],
    );
    assert_eq!(schema.len(), 2);
    assert_eq!(schema.position("id"), Some(0));
}
