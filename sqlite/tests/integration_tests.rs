//! Integration tests for the tablemap-sqlite crate.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tablemap_core::{
    CodecError, CrudError, Json, MappingBuilder, MappingRegistry, Query, QueryError, Record, SchemaError,
    SortOrder, SqlValue, TableMapping, TypeDescriptor, build_mapping, field, impl_record,
    impl_sql_enum, not,
};
use tablemap_sqlite::{Database, DatabaseConfig, Operation, SqliteError, SqliteMaster};

// Order domain

#[derive(Debug, Default, Clone, PartialEq)]
struct ProductPoco {
    id: i32,
    name: Option<String>,
    price: f64,
    total_sales: u32,
}

impl_record!(ProductPoco {
    id: Integer,
    name: Text,
    price: Real,
    total_sales: Integer,
});

#[derive(Debug, Default, Clone, PartialEq)]
struct OrderPoco {
    id: i32,
    placed_time: DateTime<Utc>,
}

impl_record!(OrderPoco {
    id: Integer,
    placed_time: DateTime,
});

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum OrderLineStatus {
    #[default]
    Placed,
    Shipped,
}

impl_sql_enum!(OrderLineStatus { Placed = 1, Shipped = 100 });

#[derive(Debug, Default, Clone, PartialEq)]
struct OrderLinePoco {
    id: i32,
    order_id: i32,
    product_id: i32,
    quantity: i32,
    unit_price: f64,
    status: OrderLineStatus,
}

impl_record!(OrderLinePoco {
    id: Integer,
    order_id: Integer,
    product_id: Integer,
    quantity: Integer,
    unit_price: Real,
    status: Enum,
});

#[derive(Debug, Default, Clone, PartialEq)]
struct OrderHistoryPoco {
    id: i32,
    order_id: i32,
    time: DateTime<Utc>,
    comment: Option<String>,
}

impl_record!(OrderHistoryPoco {
    id: Integer,
    order_id: Integer,
    time: DateTime,
    comment: Text,
});

struct DbSchema {
    products: TableMapping,
    orders: TableMapping,
    order_lines: TableMapping,
    order_history: TableMapping,
}

impl DbSchema {
    fn new() -> Self {
        Self {
            products: ProductPoco::mapping()
                .set_table_name("Product")
                .set_primary_key("id", true)
                .finalize()
                .unwrap(),
            orders: OrderPoco::mapping()
                .set_table_name("Order")
                .set_primary_key("id", true)
                .finalize()
                .unwrap(),
            order_lines: order_line_mapping(),
            order_history: OrderHistoryPoco::mapping()
                .set_table_name("OrderHistory")
                .set_primary_key("id", true)
                .finalize()
                .unwrap(),
        }
    }

    fn tables(self) -> [TableMapping; 4] {
        [
            self.products,
            self.orders,
            self.order_lines,
            self.order_history,
        ]
    }
}

fn order_line_mapping() -> TableMapping {
    OrderLinePoco::mapping()
        .set_table_name("OrderLine")
        .set_primary_key("id", true)
        .add_index("IX_OrderProduct", ["order_id", "product_id"])
        .finalize()
        .unwrap()
}

fn verify_creations(db: &Database) {
    let order_line = db.mapping::<OrderLinePoco>().unwrap();
    assert_eq!(order_line.columns().len(), 6);
    assert_eq!(order_line.table_name(), "OrderLine");

    let mut line = OrderLinePoco {
        status: OrderLineStatus::Shipped,
        ..Default::default()
    };
    assert_eq!(db.insert(&mut line).unwrap(), 1);
    assert!(line.id > 0);

    let query =
        Query::<OrderLinePoco>::new().filter(field("status").eq(OrderLineStatus::Shipped));
    let found = db.first(&query).unwrap().unwrap();
    assert_eq!(found.id, line.id);
    assert_eq!(found.status, OrderLineStatus::Shipped);
}

#[test]
fn test_type_with_no_fields_fails() {
    let err = build_mapping(TypeDescriptor::new("NoPropObject"))
        .finalize()
        .unwrap_err();
    assert_eq!(err, SchemaError::NoColumns("NoPropObject".into()));

    #[derive(Debug, Default)]
    struct OnlyIgnored {
        scratch: i64,
    }
    impl_record!(OnlyIgnored { scratch: Integer => ignored });

    let db = Database::open_in_memory().unwrap();
    let err = db.create_table::<OnlyIgnored>().unwrap_err();
    assert!(matches!(err, SqliteError::Schema(SchemaError::NoColumns(_))));
    assert!(db.tables().unwrap().is_empty());
}

#[test]
fn test_create_tables_from_schema() {
    let db = Database::open_in_memory().unwrap();
    db.run_in_transaction(|db| {
        for mapping in DbSchema::new().tables() {
            db.create_table_from(mapping)?;
        }
        Ok(())
    })
    .unwrap();

    verify_creations(&db);

    let names: Vec<_> = db.tables().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["Order", "OrderHistory", "OrderLine", "Product"]);
}

#[test]
fn test_create_table_twice() {
    let db = Database::open_in_memory().unwrap();
    for _ in 0..2 {
        for mapping in DbSchema::new().tables() {
            db.create_table_from(mapping).unwrap();
        }
    }

    verify_creations(&db);

    let indexes: Vec<_> = db
        .schema_objects()
        .unwrap()
        .into_iter()
        .filter(|o| o.kind == "index" && o.table_name == "OrderLine")
        .collect();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "IX_OrderProduct");
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Issue115MyObject {
    unique_id: String,
    other_value: u8,
}

impl_record!(Issue115MyObject {
    unique_id: Text,
    other_value: Integer,
});

#[test]
fn test_string_primary_key_insert_all_and_update() {
    let db = Database::open_in_memory().unwrap();
    db.create_table_from(
        Issue115MyObject::mapping()
            .set_primary_key("unique_id", false)
            .finalize()
            .unwrap(),
    )
    .unwrap();

    let mut objects: Vec<_> = (0..10u8)
        .map(|i| Issue115MyObject {
            unique_id: i.to_string(),
            other_value: i * 10,
        })
        .collect();
    assert_eq!(db.insert_all(&mut objects).unwrap(), 10);

    let mut stmt = db.query(&Query::<Issue115MyObject>::new()).unwrap();
    let mut visited = 0;
    for item in stmt.records().unwrap() {
        let mut item = item.unwrap();
        item.other_value += 1;
        assert_eq!(db.update(&item).unwrap(), 1);
        visited += 1;
    }
    assert_eq!(visited, 10);
    drop(stmt);

    let seven: Issue115MyObject = db.get("7").unwrap();
    assert_eq!(seven.other_value, 71);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct WantsNoRowId {
    id: i32,
    name: Option<String>,
}

impl_record!(WantsNoRowId {
    id: Integer,
    name: Text,
});

#[derive(Debug, Default, Clone, PartialEq)]
struct MasterRow {
    kind: String,
    name: String,
    table_name: String,
    root_page: i32,
    sql: Option<String>,
}

impl_record!(MasterRow {
    kind: Text,
    name: Text,
    table_name: Text,
    root_page: Integer,
    sql: Text,
});

#[test]
fn test_without_rowid_through_system_table_override() {
    let db = Database::open_in_memory().unwrap();
    let master = MasterRow::mapping()
        .set_table_name("sqlite_master")
        .override_column("kind", "type")
        .override_column("name", "name")
        .override_column("table_name", "tbl_name")
        .override_column("root_page", "rootpage")
        .override_column("sql", "sql")
        .finalize()
        .unwrap();
    db.register_override::<MasterRow>(master);

    let wants_no_row_id = WantsNoRowId::mapping()
        .set_primary_key("id", false)
        .without_row_id()
        .finalize()
        .unwrap();

    db.create_table_from(order_line_mapping()).unwrap();
    let info = db
        .first(
            &Query::<MasterRow>::new()
                .filter(field("kind").eq("table"))
                .filter(field("table_name").eq("OrderLine")),
        )
        .unwrap()
        .unwrap();
    assert!(!info.sql.unwrap().to_lowercase().contains("without rowid"));

    db.create_table_from(wants_no_row_id).unwrap();
    let info = db
        .first(
            &Query::<MasterRow>::new()
                .filter(field("kind").eq("table"))
                .filter(field("table_name").eq("WantsNoRowId")),
        )
        .unwrap()
        .unwrap();
    assert!(info.sql.unwrap().to_lowercase().contains("without rowid"));

    let sql = db.table_sql("WantsNoRowId").unwrap().unwrap();
    assert!(sql.to_lowercase().contains("without rowid"));
    assert_eq!(db.table_sql("Missing").unwrap(), None);
}

#[test]
fn test_without_rowid_rejects_autoincrement() {
    let err = WantsNoRowId::mapping()
        .set_primary_key("id", true)
        .without_row_id()
        .finalize()
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidAutoIncrement { .. }));
}

// Complex columns

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct TestChildObject {
    test_child_string: Option<String>,
    test_child_int: Option<i32>,
    test_child_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct TestObj {
    id: String,
    test_int_enumerable: Option<Json<Vec<i32>>>,
    test_string_enumerable: Option<Json<Vec<String>>>,
    test_object_enumerable: Option<Json<Vec<TestChildObject>>>,
    child_object: Option<Json<TestChildObject>>,
}

impl_record!(TestObj {
    id: Text => primary_key,
    test_int_enumerable: Complex,
    test_string_enumerable: Complex,
    test_object_enumerable: Complex,
    child_object: Complex,
});

fn json_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("json.db")).unwrap();
    db.create_table::<TestObj>().unwrap();
    (dir, db)
}

fn read_all(db: &Database) -> Vec<TestObj> {
    db.prepare_sql::<TestObj>("select * from TestObj order by id", &[])
        .unwrap()
        .all()
        .unwrap()
}

fn child(n: i32, label: &str) -> TestChildObject {
    TestChildObject {
        test_child_string: Some(label.to_string()),
        test_child_int: Some(n),
        test_child_date: Some(Utc::now() + chrono::Duration::seconds(i64::from(n))),
    }
}

#[test]
fn test_persist_and_read_child_objects() {
    let (_dir, db) = json_db();
    let mut obj1 = TestObj {
        id: "1".into(),
        child_object: Some(Json(child(1, "Test Child String 1"))),
        ..Default::default()
    };
    let mut obj2 = TestObj {
        id: "2".into(),
        child_object: Some(Json(child(2, "Test Child String 2"))),
        ..Default::default()
    };
    assert_eq!(db.insert(&mut obj1).unwrap(), 1);
    assert_eq!(db.insert(&mut obj2).unwrap(), 1);

    let result = read_all(&db);
    assert_eq!(result, vec![obj1, obj2]);
}

#[test]
fn test_persist_and_read_int_and_string_sequences() {
    let (_dir, db) = json_db();
    let mut objs = vec![
        TestObj {
            id: "1".into(),
            test_int_enumerable: Some(Json(vec![1, 2, 3])),
            test_string_enumerable: Some(Json(vec!["1".into(), "2".into(), "3".into()])),
            ..Default::default()
        },
        TestObj {
            id: "2".into(),
            test_int_enumerable: Some(Json(vec![4, 5, 6])),
            test_string_enumerable: Some(Json(vec![
                "String 4".into(),
                "String 5".into(),
                "String 6".into(),
            ])),
            ..Default::default()
        },
    ];
    assert_eq!(db.insert_all(&mut objs).unwrap(), 2);

    let result = read_all(&db);
    assert_eq!(result, objs);
    assert_eq!(result[1].test_int_enumerable.as_deref(), Some(&vec![4, 5, 6]));
}

#[test]
fn test_persist_and_read_object_sequences() {
    let (_dir, db) = json_db();
    let mut obj = TestObj {
        id: "1".into(),
        test_object_enumerable: Some(Json(vec![
            child(1, "String 1.1"),
            child(2, "String 1.2"),
            child(3, "String 1.3"),
        ])),
        ..Default::default()
    };
    db.insert(&mut obj).unwrap();

    let result = read_all(&db);
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].test_object_enumerable, obj.test_object_enumerable);
}

#[test]
fn test_empty_sequence_is_distinct_from_unset() {
    let (_dir, db) = json_db();
    let mut empty = TestObj {
        id: "1".into(),
        test_int_enumerable: Some(Json(Vec::new())),
        test_string_enumerable: Some(Json(Vec::new())),
        test_object_enumerable: Some(Json(Vec::new())),
        ..Default::default()
    };
    let mut unset = TestObj {
        id: "2".into(),
        ..Default::default()
    };
    db.insert(&mut empty).unwrap();
    db.insert(&mut unset).unwrap();

    let result = read_all(&db);
    assert_eq!(result[0].test_int_enumerable, Some(Json(Vec::new())));
    assert_eq!(result[0].test_string_enumerable, Some(Json(Vec::new())));
    assert_eq!(result[0].test_object_enumerable, Some(Json(Vec::new())));
    assert_eq!(result[1].test_int_enumerable, None);
    assert_eq!(result[1].test_object_enumerable, None);
    assert_ne!(result[0].test_int_enumerable, result[1].test_int_enumerable);

    let stored: Option<String> = db
        .connection()
        .query_row(
            "SELECT test_int_enumerable FROM TestObj WHERE id = '2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, None);
}

#[test]
fn test_malformed_json_surfaces_as_codec_error() {
    let (_dir, db) = json_db();
    db.execute(
        "INSERT INTO TestObj (id, child_object) VALUES (?, ?)",
        &[SqlValue::from("bad"), SqlValue::from("{not json")],
    )
    .unwrap();
    let err = db.get::<TestObj>("bad").unwrap_err();
    assert!(matches!(err, SqliteError::Codec(_)));
}

// Core properties

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    id: i64,
    name: String,
}

impl_record!(Order {
    id: Integer => primary_key auto_increment,
    name: Text,
});

fn order_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.create_table::<Order>().unwrap();
    db
}

fn insert_order(db: &Database, name: &str) -> Order {
    let mut order = Order {
        name: name.to_string(),
        ..Default::default()
    };
    db.insert(&mut order).unwrap();
    order
}

#[test]
fn test_autoincrement_keys_increase() {
    let db = order_db();
    let first = insert_order(&db, "a");
    let second = insert_order(&db, "b");
    assert!(first.id > 0);
    assert!(second.id > first.id);

    let mut explicit = Order {
        id: 500,
        name: "c".into(),
    };
    db.insert(&mut explicit).unwrap();
    assert_eq!(explicit.id, 500);
    assert_eq!(db.get::<Order>(500i64).unwrap().name, "c");
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Ticket {
    id: i32,
    title: String,
}

impl_record!(Ticket {
    id: Integer => primary_key auto_increment,
    title: Text,
});

#[test]
fn test_assigned_key_too_wide_for_field_rolls_back_insert() {
    let db = Database::open_in_memory().unwrap();
    db.create_table::<Ticket>().unwrap();

    let mut last = Ticket {
        id: i32::MAX,
        title: "last".into(),
    };
    db.insert(&mut last).unwrap();

    let mut overflow = Ticket {
        id: 0,
        title: "overflow".into(),
    };
    let err = db.insert(&mut overflow).unwrap_err();
    assert!(matches!(
        err,
        SqliteError::Codec(CodecError::OutOfRange { target: "i32", .. })
    ));
    assert_eq!(overflow.id, 0);
    assert_eq!(db.count(&Query::<Ticket>::new()).unwrap(), 1);
    assert_eq!(db.transaction_depth(), 0);
}

#[test]
fn test_filter_returns_matching_row_only() {
    let db = order_db();
    insert_order(&db, "Shipped");
    insert_order(&db, "Pending");

    let rows = db
        .query_all(&Query::<Order>::new().filter(field("name").eq("Shipped")))
        .unwrap();
    assert_eq!(
        rows,
        vec![Order {
            id: 1,
            name: "Shipped".into()
        }]
    );
}

#[test]
fn test_unknown_field_fails_before_execution() {
    let db = order_db();
    let err = db
        .query(&Query::<Order>::new().filter(field("status").eq(1)))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SqliteError::Query(QueryError::UnknownField { .. })
    ));
}

#[test]
fn test_update_with_default_key_fails() {
    let db = order_db();
    insert_order(&db, "x");
    let err = db.update(&Order::default()).unwrap_err();
    assert!(matches!(
        err,
        SqliteError::Crud(CrudError::MissingKeyForUpdate(_))
    ));
    assert_eq!(db.count(&Query::<Order>::new()).unwrap(), 1);
}

#[test]
fn test_query_ordering_paging_and_counts() {
    let db = order_db();
    for name in ["d", "b", "a", "c", "e"] {
        insert_order(&db, name);
    }

    let page = db
        .query_all(
            &Query::<Order>::new()
                .order_by("name", SortOrder::Asc)
                .limit(2)
                .offset(1),
        )
        .unwrap();
    let names: Vec<_> = page.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);

    let query = Query::<Order>::new().filter(field("name").gt("b").and(not(field("name").eq("d"))));
    assert_eq!(db.count(&query).unwrap(), 2);
    assert_eq!(db.delete_where(&query).unwrap(), 2);
    assert_eq!(db.count(&Query::<Order>::new()).unwrap(), 3);
}

#[test]
fn test_cursor_is_restartable_per_execution() {
    let db = order_db();
    insert_order(&db, "a");
    let mut stmt = db.query(&Query::<Order>::new()).unwrap();
    assert_eq!(stmt.records().unwrap().count(), 1);

    insert_order(&db, "b");
    let names: Vec<_> = stmt
        .records()
        .unwrap()
        .map(|o| o.unwrap().name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_find_get_and_delete() {
    let db = order_db();
    let order = insert_order(&db, "gone");

    assert_eq!(db.find::<Order>(order.id).unwrap(), Some(order.clone()));
    assert_eq!(db.delete(&order).unwrap(), 1);
    assert_eq!(db.find::<Order>(order.id).unwrap(), None);
    assert!(matches!(
        db.get::<Order>(order.id),
        Err(SqliteError::NotFound { table }) if table == "Order"
    ));

    let other = insert_order(&db, "other");
    assert_eq!(db.delete_by_key::<Order>(other.id).unwrap(), 1);
    assert_eq!(db.delete_by_key::<Order>(other.id).unwrap(), 0);
}

#[test]
fn test_insert_or_replace_overwrites() {
    let db = order_db();
    let order = insert_order(&db, "old");
    let mut replacement = Order {
        id: order.id,
        name: "new".into(),
    };
    db.insert_or_replace(&mut replacement).unwrap();
    assert_eq!(db.count(&Query::<Order>::new()).unwrap(), 1);
    assert_eq!(db.get::<Order>(order.id).unwrap().name, "new");

    let err = db.insert(&mut replacement).unwrap_err();
    assert!(matches!(
        err,
        SqliteError::Engine {
            operation: Operation::Insert,
            ..
        }
    ));
}

#[test]
fn test_insert_all_rolls_back_on_failure() {
    let db = order_db();
    let mut batch = vec![
        Order {
            id: 1,
            name: "a".into(),
        },
        Order {
            id: 1,
            name: "dup".into(),
        },
    ];
    assert!(db.insert_all(&mut batch).is_err());
    assert_eq!(db.count(&Query::<Order>::new()).unwrap(), 0);
    assert_eq!(db.transaction_depth(), 0);
}

#[test]
fn test_nested_transactions() {
    let db = order_db();
    db.run_in_transaction(|db| {
        insert_order(db, "outer");
        let inner: Result<(), SqliteError> = db.run_in_transaction(|db| {
            insert_order(db, "inner");
            Err(SqliteError::NotFound {
                table: "Order".into(),
            })
        });
        assert!(inner.is_err());
        assert_eq!(db.transaction_depth(), 1);
        Ok(())
    })
    .unwrap();

    let names: Vec<_> = db
        .query_all(&Query::<Order>::new())
        .unwrap()
        .into_iter()
        .map(|o| o.name)
        .collect();
    assert_eq!(names, vec!["outer"]);
}

#[test]
fn test_panic_inside_transaction_rolls_back() {
    let db = order_db();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        db.run_in_transaction(|db| -> Result<(), SqliteError> {
            insert_order(db, "lost");
            panic!("boom");
        })
    }));
    assert!(result.is_err());
    assert_eq!(db.transaction_depth(), 0);
    assert_eq!(db.count(&Query::<Order>::new()).unwrap(), 0);
}

#[test]
fn test_update_all_counts_rows() {
    let db = order_db();
    let mut orders = vec![insert_order(&db, "a"), insert_order(&db, "b")];
    for order in &mut orders {
        order.name.push('!');
    }
    assert_eq!(db.update_all(&orders).unwrap(), 2);
    assert_eq!(db.get::<Order>(orders[1].id).unwrap().name, "b!");
}

#[test]
fn test_drop_table() {
    let db = order_db();
    db.drop_table::<Order>().unwrap();
    assert!(db.tables().unwrap().is_empty());
    db.drop_table::<Order>().unwrap();
}

#[test]
fn test_raw_sql_with_aliased_columns() {
    let db = order_db();
    insert_order(&db, "x");
    let rows = db
        .prepare_sql::<Order>(
            "SELECT name AS NAME, 42 AS unrelated FROM \"Order\" WHERE name = ?",
            &[SqlValue::from("x")],
        )
        .unwrap()
        .all()
        .unwrap();
    assert_eq!(
        rows,
        vec![Order {
            id: 0,
            name: "x".into()
        }]
    );
}

// Datetime and configuration

#[derive(Debug, Default, Clone, PartialEq)]
struct Event {
    id: i64,
    at: DateTime<Utc>,
    seen: Option<DateTime<Utc>>,
    done: bool,
}

impl_record!(Event {
    id: Integer => primary_key auto_increment,
    at: DateTime,
    seen: DateTime,
    done: Boolean,
});

fn round_trip_event(db: &Database) -> String {
    db.create_table::<Event>().unwrap();
    let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let mut event = Event {
        at,
        done: true,
        ..Default::default()
    };
    db.insert(&mut event).unwrap();
    let loaded = db.get::<Event>(event.id).unwrap();
    assert_eq!(loaded, event);

    let later = db
        .query_all(&Query::<Event>::new().filter(field("at").ge(at).and(field("done"))))
        .unwrap();
    assert_eq!(later.len(), 1);

    db.connection()
        .query_row("SELECT typeof(at) FROM Event", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_datetime_text_storage() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(round_trip_event(&db), "text");
}

#[test]
fn test_datetime_integer_storage_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("db.yml");
    std::fs::write(&config_path, "datetime_storage: unix_nanos\nbusy_timeout_ms: 100\n").unwrap();
    let config = DatabaseConfig::load(&config_path).unwrap();

    let db = Database::open_with(dir.path().join("events.db"), &config).unwrap();
    assert_eq!(round_trip_event(&db), "integer");
}

#[test]
fn test_shared_registry_between_connections() {
    let registry = Arc::new(MappingRegistry::new());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let writer = Database::open(&path)
        .unwrap()
        .with_registry(Arc::clone(&registry));
    writer
        .create_table_from(
            MappingBuilder::for_record::<Order>()
                .set_table_name("orders_renamed")
                .finalize()
                .unwrap(),
        )
        .unwrap();
    insert_order(&writer, "shared");

    let reader = Database::new(Connection::open(&path).unwrap())
        .unwrap()
        .with_registry(registry);
    let rows = reader.query_all(&Query::<Order>::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(reader.mapping::<Order>().unwrap().table_name(), "orders_renamed");
}

#[test]
fn test_system_table_listing() {
    let db = Database::open_in_memory().unwrap();
    db.create_table_from(order_line_mapping()).unwrap();
    let tables = db.tables().unwrap();
    assert_eq!(tables.len(), 1);
    let SqliteMaster {
        kind, table_name, ..
    } = &tables[0];
    assert_eq!(kind, "table");
    assert_eq!(table_name, "OrderLine");
}

#[test]
fn test_system_table_listing_after_mapping_is_resolved() {
    let db = Database::open_in_memory().unwrap();
    db.create_table_from(order_line_mapping()).unwrap();

    let mapping = db.mapping::<SqliteMaster>().unwrap();
    assert_eq!(mapping.table_name(), "sqlite_master");
    let everything = db.query_all(&Query::<SqliteMaster>::new()).unwrap();
    assert!(everything.iter().any(|entry| entry.name == "IX_OrderProduct"));

    let tables = db.tables().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "OrderLine");
    assert!(db.table_sql("OrderLine").unwrap().is_some());
    assert!(
        db.schema_objects()
            .unwrap()
            .iter()
            .any(|entry| entry.kind == "index")
    );
}
