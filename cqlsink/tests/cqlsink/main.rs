use std::collections::HashMap;

use cqlsink::*;
use expect_test::expect;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("CQLSINK_LOG").unwrap_or_else(|_| EnvFilter::new("cqlsink=debug"));
    let _ = tracing_subscriber::fmt::fmt().with_env_filter(filter).with_test_writer().try_init();
}

fn properties(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn default_properties() -> HashMap<String, String> {
    properties(&[
        (KEYSPACE, "sink"),
        (TABLE, "events"),
        (CONTACT_POINTS, "10.0.0.1:9042,10.0.0.2:9042"),
    ])
}

fn events_catalog() -> MemCatalog {
    let mut catalog = MemCatalog::new();
    catalog.create_table(
        "sink",
        "events",
        [
            Column::new("id", LogicalType::BigInt),
            Column::new("name", LogicalType::Text),
            Column::new("created", LogicalType::Timestamp),
        ],
    );
    catalog
}

fn started() -> (SinkTask<MemSession>, MemSession) {
    init_tracing();
    let session = MemSession::new("test-cluster", events_catalog());
    let mut task = SinkTask::new();
    let connected = session.clone();
    task.start(&default_properties(), |points| {
        assert_eq!(points.len(), 2);
        Ok(connected)
    })
    .unwrap();
    (task, session)
}

fn millis(value: &Value) -> Option<i64> {
    match value {
        Value::Timestamp(ts) => Some(ts.timestamp_millis()),
        _ => None,
    }
}

fn record(offset: i64, entries: impl IntoIterator<Item = (&'static str, Datum)>) -> SinkRecord {
    SinkRecord::new("events", 0, offset).with_value(entries.into_iter().collect::<Datum>())
}

#[test]
fn config_reads_connector_properties() {
    let config = SinkConfig::from_properties(&default_properties()).unwrap();
    assert_eq!(config.keyspace(), "sink");
    assert_eq!(config.table(), "events");
    assert_eq!(config.port(), 9042);
    assert_eq!(
        config.contact_points(),
        [ContactPoint::new("10.0.0.1", 9042), ContactPoint::new("10.0.0.2", 9042)]
    );
}

#[test]
fn config_rejects_bad_properties() {
    let check = |entries: &[(&str, &str)]| {
        SinkConfig::from_properties(&properties(entries)).unwrap_err().to_string()
    };

    expect!["invalid configuration: missing required property `yugabyte.cql.keyspace`"]
        .assert_eq(&check(&[(TABLE, "t"), (CONTACT_POINTS, "h:1")]));
    expect!["invalid configuration: missing required property `yugabyte.cql.tablename`"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, " "), (CONTACT_POINTS, "h:1")]));
    expect!["invalid configuration: using multiple CQL ports is not supported: a:9042,b:9043"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, "t"), (CONTACT_POINTS, "a:9042,b:9043")]));
    expect!["invalid configuration: invalid contact point `a`, expected host:port"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, "t"), (CONTACT_POINTS, "a")]));
    expect!["invalid configuration: invalid contact point `a:1:2`, expected host:port"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, "t"), (CONTACT_POINTS, "a:1:2")]));
    expect!["invalid configuration: invalid port in contact point `a:port`: invalid digit found in string"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, "t"), (CONTACT_POINTS, "a:port")]));
    expect!["invalid configuration: contact point `:9042` has no host"]
        .assert_eq(&check(&[(KEYSPACE, "ks"), (TABLE, "t"), (CONTACT_POINTS, ":9042")]));
}

#[test]
fn full_record_is_written() {
    let (mut task, session) = started();
    let output = task
        .put(vec![record(
            0,
            [
                ("id", Datum::Int64(1)),
                ("name", Datum::from("alice")),
                ("created", Datum::from("2023-01-15 10:30:00")),
            ],
        )])
        .unwrap();
    assert_eq!(output.statements.len(), 1);
    assert!(output.rejected.is_empty());

    let rows = session.rows("sink", "events");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], Value::BigInt(1));
    assert_eq!(rows[0][1], Value::Text("alice".into()));
    assert_eq!(millis(&rows[0][2]), Some(1_673_778_600_000));
}

#[test]
fn missing_columns_are_written_as_null() {
    let (mut task, session) = started();
    task.put(vec![record(0, [("id", Datum::Int64(2))])]).unwrap();
    assert_eq!(session.rows("sink", "events"), [vec![Value::BigInt(2), Value::Null, Value::Null]]);
}

#[test]
fn unknown_column_rejects_only_that_record() {
    let (mut task, session) = started();
    let output = task
        .put(vec![
            record(10, [("id", Datum::Int64(3)), ("nickname", Datum::from("bob"))]),
            record(11, [("id", Datum::Int64(4))]),
        ])
        .unwrap();

    assert_eq!(output.statements.len(), 1);
    let [rejected] = &output.rejected[..] else { panic!("expected one rejected record") };
    assert_eq!((rejected.index, rejected.offset), (0, 10));
    expect![[r#"record fields ["nickname"] are not columns of table `sink.events`"#]]
        .assert_eq(&rejected.error.to_string());
    assert_eq!(session.rows("sink", "events").len(), 1);
}

#[test]
fn malformed_timestamp_rejects_only_that_record() {
    let (mut task, session) = started();
    let records = (0..5)
        .map(|i| {
            let created = if i == 2 { "15/01/2023 10:30" } else { "2023-01-15 10:30:00" };
            record(i, [("id", Datum::Int64(i)), ("created", Datum::from(created))])
        })
        .collect();

    let output = task.put(records).unwrap();
    assert_eq!(output.statements.len(), 4);
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.rejected[0].index, 2);
    assert!(matches!(output.rejected[0].error, cqlsink_bind::Error::TimestampFormat { .. }));

    let rows = session.rows("sink", "events");
    let ids = rows.iter().map(|row| row[0].clone()).collect::<Vec<_>>();
    assert_eq!(ids, [0, 1, 3, 4].map(Value::BigInt));
}

#[test]
fn typed_records_use_their_field_types() {
    let (mut task, session) = started();
    let value_schema = Schema::structure([
        Field::primitive("id", FieldType::Int64),
        Field::primitive("Name", FieldType::String),
        Field::primitive("created", FieldType::Int64),
    ]);
    let value = Struct::new().put("id", 5_i64).put("Name", "eve").put("created", 0_i64);
    let output = task
        .put(vec![SinkRecord::new("events", 0, 0).with_typed_value(value_schema, value)])
        .unwrap();
    assert!(output.rejected.is_empty());

    // an int64 field is bound as a bigint even though the column is a timestamp
    assert_eq!(
        session.rows("sink", "events"),
        [vec![Value::BigInt(5), Value::Text("eve".into()), Value::BigInt(0)]]
    );
}

#[test]
fn records_must_have_a_supported_shape() {
    let (mut task, _session) = started();
    let output = task
        .put(vec![
            SinkRecord::new("events", 0, 0).with_value("not a map"),
            SinkRecord::new("events", 0, 1)
                .with_typed_value(Schema::primitive(FieldType::String), "still not a struct"),
            SinkRecord::new("events", 0, 2).with_typed_value(
                Schema::structure([Field::primitive("id", FieldType::Int64)]),
                Datum::Int64(1),
            ),
        ])
        .unwrap();

    assert!(output.statements.is_empty());
    let errors = output.rejected.iter().map(|r| r.error.to_string()).collect::<Vec<_>>();
    expect![[r#"
        [
            "invalid record shape: expected map value, found string value",
            "invalid record shape: expected struct value with a struct schema, found string value with a string schema",
            "invalid record shape: expected struct value with a struct schema, found int64 value with a struct schema",
        ]
    "#]]
    .assert_debug_eq(&errors);
}

#[test]
fn nested_value_schemas_reject_the_record() {
    let (mut task, session) = started();
    let value_schema = Schema::structure([
        Field::primitive("id", FieldType::Int64),
        Field::new("name", Schema::structure([Field::primitive("first", FieldType::String)])),
    ]);
    let value = Struct::new().put("id", 9_i64).put("name", Datum::Null);
    let output = task
        .put(vec![SinkRecord::new("events", 0, 4).with_typed_value(value_schema, value)])
        .unwrap();

    assert!(output.statements.is_empty());
    assert_eq!(output.rejected.len(), 1);
    assert_eq!(output.rejected[0].offset, 4);
    assert!(matches!(
        output.rejected[0].error,
        cqlsink_bind::Error::InvalidRecordShape { .. }
    ));
    assert!(session.rows("sink", "events").is_empty());
}

#[test]
fn records_without_a_value_are_skipped() {
    let (mut task, session) = started();
    let output = task
        .put(vec![
            SinkRecord::new("events", 0, 0),
            SinkRecord::new("events", 0, 1).with_key("k", None).with_value(Datum::Null),
        ])
        .unwrap();
    assert_eq!(output.skipped, 2);
    assert!(output.statements.is_empty());
    assert!(session.rows("sink", "events").is_empty());
}

#[test]
fn schema_is_reloaded_for_every_batch() {
    let (mut task, session) = started();
    let nickname = || record(0, [("id", Datum::Int64(1)), ("nickname", Datum::from("bob"))]);

    let output = task.put(vec![nickname()]).unwrap();
    assert_eq!(output.rejected.len(), 1);

    session
        .catalog_mut()
        .add_column("sink", "events", Column::new("nickname", LogicalType::Varchar))
        .unwrap();
    let output = task.put(vec![nickname()]).unwrap();
    assert!(output.rejected.is_empty());
    expect!["INSERT INTO sink.events (id, name, created, nickname) VALUES (:id, :name, :created, :nickname)"]
        .assert_eq(output.statements[0].prepared().query());
    assert_eq!(session.rows("sink", "events")[0].len(), 4);
}

#[test]
fn missing_table_fails_the_batch() {
    let (mut task, session) = started();
    session.catalog_mut().drop_table("sink", "events").unwrap();
    let err = task.put(vec![record(0, [("id", Datum::Int64(1))])]).unwrap_err();
    assert!(matches!(err, Error::Catalog(cqlsink_catalog::Error::SchemaNotFound { .. })));
    expect!["table `sink.events` not found"].assert_eq(&err.to_string());
}

#[test]
fn lifecycle() {
    init_tracing();
    let mut task = SinkTask::<MemSession>::new();
    assert_eq!(task.version(), "1");
    assert!(matches!(task.put(vec![]), Err(Error::NotStarted)));

    let err = task
        .start(&properties(&[(KEYSPACE, "sink")]), |_| unreachable!("config is invalid"))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let session = MemSession::new("test-cluster", events_catalog());
    let connected = session.clone();
    task.start(&default_properties(), move |_| Ok(connected)).unwrap();
    assert_eq!(task.session().map(Session::cluster_name), Some("test-cluster"));

    let output = task.put(vec![]).unwrap();
    assert!(output.statements.is_empty() && output.rejected.is_empty());

    task.stop().unwrap();
    assert!(session.is_closed());
    task.stop().unwrap();
    assert!(matches!(task.put(vec![]), Err(Error::NotStarted)));
}

/// Delegates to a [`MemSession`] but never manages to close.
struct StuckSession(MemSession);

impl Catalog for StuckSession {
    fn columns(&self, keyspace: &str, table: &str) -> cqlsink_catalog::Result<Vec<Column>> {
        self.0.columns(keyspace, table)
    }
}

impl Session for StuckSession {
    fn prepare(
        &self,
        template: InsertTemplate,
    ) -> anyhow::Result<std::sync::Arc<PreparedStatement>> {
        self.0.prepare(template)
    }

    fn execute(&self, stmt: &BoundStatement) -> anyhow::Result<()> {
        self.0.execute(stmt)
    }

    fn close(&self) -> anyhow::Result<()> {
        anyhow::bail!("timed out closing `{}`", self.0.cluster_name())
    }

    fn cluster_name(&self) -> &str {
        self.0.cluster_name()
    }
}

#[test]
fn restarting_replaces_the_session() {
    init_tracing();
    let mut task = SinkTask::new();
    let old = MemSession::new("old", events_catalog());
    let connected = old.clone();
    task.start(&default_properties(), move |_| Ok(connected)).unwrap();
    let new = MemSession::new("new", events_catalog());
    let connected = new.clone();
    task.start(&default_properties(), move |_| Ok(connected)).unwrap();
    assert!(old.is_closed());
    assert!(!new.is_closed());
    assert_eq!(task.session().map(Session::cluster_name), Some("new"));
}

#[test]
fn restarting_survives_a_previous_session_that_fails_to_close() {
    init_tracing();
    let mut task = SinkTask::new();
    let old = MemSession::new("old", events_catalog());
    let connected = StuckSession(old.clone());
    task.start(&default_properties(), move |_| Ok(connected)).unwrap();

    let new = MemSession::new("new", events_catalog());
    let connected = StuckSession(new.clone());
    task.start(&default_properties(), move |_| Ok(connected)).unwrap();
    assert_eq!(task.session().map(Session::cluster_name), Some("new"));

    let output = task.put(vec![record(0, [("id", Datum::Int64(1))])]).unwrap();
    assert_eq!(output.statements.len(), 1);
    assert_eq!(new.rows("sink", "events").len(), 1);
    assert!(old.rows("sink", "events").is_empty());
}

#[test]
fn connect_failures_are_session_errors() {
    init_tracing();
    let mut task = SinkTask::<MemSession>::new();
    let err = task
        .start(&default_properties(), |points| anyhow::bail!("no route to {}", points[0]))
        .unwrap_err();
    expect!["no route to 10.0.0.1:9042"].assert_eq(&err.to_string());
    assert!(task.session().is_none());
}

#[test]
fn closed_sessions_refuse_statements() {
    let session = MemSession::new("c", events_catalog());
    session.close().unwrap();
    let schema = cqlsink_catalog::load_schema(&session, "sink", "events").unwrap();
    let err = session.prepare(InsertTemplate::build(&schema).unwrap()).unwrap_err();
    expect!["session to cluster `c` is closed"].assert_eq(&err.to_string());
}

#[test]
fn sessions_only_execute_fully_bound_statements() {
    let session = MemSession::new("c", events_catalog());
    let schema = cqlsink_catalog::load_schema(&session, "sink", "events").unwrap();
    let prepared = session.prepare(InsertTemplate::build(&schema).unwrap()).unwrap();
    let mut stmt = BoundStatement::new(prepared);
    stmt.set("id", 1_i64).unwrap();
    let err = session.execute(&stmt).unwrap_err();
    expect!["cannot execute `INSERT INTO sink.events (id, name, created) VALUES (:id, :name, :created)`, markers name, created are not bound"]
        .assert_eq(&err.to_string());
}
