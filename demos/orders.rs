//! Typed record workflow example.
//!
//! Creates an order schema, inserts records with JSON-backed fields, queries
//! them back through the lazy cursor and runs a multi-row update inside a
//! transaction.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p tablemap-demos --example orders
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tablemap_core::{Json, Query, Record, SortOrder, field, impl_record, impl_sql_enum};
use tablemap_sqlite::Database;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Status {
    #[default]
    Placed,
    Shipped,
}

impl_sql_enum!(Status { Placed = 1, Shipped = 100 });

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Address {
    street: String,
    city: String,
}

#[derive(Debug, Default)]
struct Order {
    id: i64,
    customer: String,
    placed_at: DateTime<Utc>,
    status: Status,
    total: f64,
    ship_to: Option<Json<Address>>,
    notes: Option<Json<Vec<String>>>,
}

impl_record!(Order {
    id: Integer => primary_key auto_increment,
    customer: Text => indexed not_null,
    placed_at: DateTime,
    status: Enum,
    total: Real,
    ship_to: Complex,
    notes: Complex,
});

impl Order {
    fn new(customer: &str, total: f64) -> Self {
        Self {
            customer: customer.into(),
            placed_at: Utc::now(),
            total,
            ..Default::default()
        }
    }
}

fn main() {
    // === Step 1: Create the table ===
    println!("=== Schema ===");
    let db = Database::open_in_memory().unwrap();
    db.create_table::<Order>().unwrap();
    for object in db.schema_objects().unwrap() {
        if let Some(sql) = object.sql {
            println!("  {sql}");
        }
    }

    // === Step 2: Insert records ===
    println!("\n=== Insert ===");
    let mut orders = vec![
        Order {
            ship_to: Some(Json(Address {
                street: "1 Main St".into(),
                city: "Springfield".into(),
            })),
            ..Order::new("alice", 42.5)
        },
        Order {
            notes: Some(Json(vec!["gift wrap".into(), "fragile".into()])),
            ..Order::new("bob", 12.0)
        },
        Order::new("carol", 99.9),
    ];
    let inserted = db.insert_all(&mut orders).unwrap();
    for order in &orders {
        println!("  #{} {} {:.2}", order.id, order.customer, order.total);
    }
    println!("Inserted {inserted} orders");

    // === Step 3: Query through the cursor ===
    println!("\n=== Query ===");
    let query = Query::<Order>::new()
        .filter(field("total").gt(20.0))
        .order_by("total", SortOrder::Desc);
    let mut stmt = db.query(&query).unwrap();
    for order in stmt.records().unwrap() {
        let order = order.unwrap();
        let city = order
            .ship_to
            .as_ref()
            .map(|addr| addr.0.city.as_str())
            .unwrap_or("-");
        println!("  {} {:.2} ships to {city}", order.customer, order.total);
    }
    drop(stmt);

    // === Step 4: Update inside a transaction ===
    println!("\n=== Ship ===");
    db.run_in_transaction(|db| {
        let mut placed = db.query_all(&Query::<Order>::new().filter(field("status").eq(Status::Placed)))?;
        for order in &mut placed {
            order.status = Status::Shipped;
        }
        db.update_all(&placed)
    })
    .unwrap();
    let shipped = db
        .count(&Query::<Order>::new().filter(field("status").eq(Status::Shipped)))
        .unwrap();
    println!("Shipped {shipped} orders");

    // === Step 5: Point lookups and deletes ===
    println!("\n=== Lookup ===");
    let bob: Order = db.get(orders[1].id).unwrap();
    let notes = bob.notes.map(|n| n.0).unwrap_or_default();
    println!("  {} notes: {}", bob.customer, notes.join(", "));

    db.delete_by_key::<Order>(orders[2].id).unwrap();
    let remaining = db.count(&Query::<Order>::new()).unwrap();
    println!("Remaining after delete: {remaining}");

    let descriptor = Order::descriptor();
    println!(
        "\n{} has {} persisted fields",
        descriptor.type_name,
        descriptor.persistable_fields().count()
    );
}
