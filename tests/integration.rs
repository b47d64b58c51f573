//! End-to-end scenarios against a `tempfile`-backed `Database`, exercising
//! the full insert/get/update/delete/scan contract across a restart.

use bindb::{ColumnDefinition, ColumnType, Config, Database, Row, Value};
use tempfile::tempdir;

fn widgets_schema() -> bindb::Schema {
    bindb::Schema::new(
        "shop",
        "widgets",
        vec![
            ColumnDefinition::new("name", ColumnType::Text).with_length(32),
            ColumnDefinition::new("price", ColumnType::Number),
        ],
    )
    .unwrap()
}

fn widget(name: &str, price: f64) -> Row {
    let mut row = Row::new();
    row.insert("name".to_string(), Value::Text(name.to_string()));
    row.insert("price".to_string(), Value::Number(price));
    row
}

#[test]
fn round_trip_encode_insert_flush_reopen_get() {
    let _ = env_logger::try_init();
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path());
    let mut db = Database::create(config, "shop").unwrap();
    db.create_table("widgets", widgets_schema()).unwrap();

    let inserted = db.table_mut("widgets").unwrap().insert(widget("gizmo", 9.99)).unwrap();
    let id = inserted.get("id").unwrap().as_id().unwrap().to_string();
    db.table_mut("widgets").unwrap().flush().unwrap();
    db.close().unwrap();

    let config = Config::new(dir.path());
    let mut reopened = Database::init(config, "shop").unwrap();
    let fetched = reopened.table_mut("widgets").unwrap().get(&id).unwrap().unwrap();
    assert_eq!(fetched.get("name"), Some(&Value::Text("gizmo".to_string())));
    assert_eq!(fetched.get("price"), Some(&Value::Number(9.99)));
}

#[test]
fn deleted_row_is_invisible_and_count_drops() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path());
    let mut db = Database::create(config, "shop").unwrap();
    db.create_table("widgets", widgets_schema()).unwrap();

    let inserted = db.table_mut("widgets").unwrap().insert(widget("bolt", 0.5)).unwrap();
    let id = inserted.get("id").unwrap().as_id().unwrap().to_string();

    assert!(db.table_mut("widgets").unwrap().delete(&id).unwrap());
    assert!(db.table_mut("widgets").unwrap().get(&id).unwrap().is_none());
    assert_eq!(db.table_mut("widgets").unwrap().count(), 0);
}

#[test]
fn slot_reuse_after_delete() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path());
    let mut db = Database::create(config, "shop").unwrap();
    db.create_table("widgets", widgets_schema()).unwrap();

    let table = db.table_mut("widgets").unwrap();
    let a = table.insert(widget("a", 1.0)).unwrap();
    let b = table.insert(widget("b", 2.0)).unwrap();
    let b_id = b.get("id").unwrap().as_id().unwrap().to_string();
    table.delete(&b_id).unwrap();
    let c = table.insert(widget("c", 3.0)).unwrap();

    let all = table.get_all().unwrap();
    assert_eq!(all.len(), 2);
    let a_id = a.get("id").unwrap().as_id().unwrap().to_string();
    let c_id = c.get("id").unwrap().as_id().unwrap().to_string();
    assert!(table.get(&a_id).unwrap().is_some());
    assert!(table.get(&c_id).unwrap().is_some());
    assert!(table.get(&b_id).unwrap().is_none());
}

#[test]
fn bulk_insert_of_one_thousand_then_random_access() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path()).with_cache_capacity(128);
    let mut db = Database::create(config, "shop").unwrap();
    db.create_table("widgets", widgets_schema()).unwrap();

    let rows: Vec<Row> = (0..1000).map(|i| widget(&format!("item_{i}"), i as f64)).collect();
    let table = db.table_mut("widgets").unwrap();
    let inserted = table.bulk_insert(rows).unwrap();
    assert_eq!(inserted.len(), 1000);
    assert_eq!(table.count(), 1000);

    for i in [0usize, 1, 250, 500, 750, 999] {
        let id = inserted[i].get("id").unwrap().as_id().unwrap().to_string();
        let fetched = table.get(&id).unwrap().unwrap();
        assert_eq!(fetched.get("name"), Some(&Value::Text(format!("item_{i}"))));
    }
}

#[test]
fn persistence_across_restart_lists_table_in_metadata() {
    let dir = tempdir().unwrap();
    {
        let config = Config::new(dir.path());
        let mut db = Database::create(config, "shop").unwrap();
        db.create_table("widgets", widgets_schema()).unwrap();
        db.table_mut("widgets").unwrap().insert(widget("a", 1.0)).unwrap();
        db.close().unwrap();
    }

    let config = Config::new(dir.path());
    let reopened = Database::init(config, "shop").unwrap();
    assert_eq!(reopened.table_names(), &["widgets".to_string()]);
    assert_eq!(reopened.table("widgets").unwrap().count(), 1);
}

#[test]
fn write_buffer_coalesces_two_updates_into_one_physical_write() {
    let dir = tempdir().unwrap();
    let config = Config::new(dir.path()).with_write_buffer(bindb::WriteBufferConfig {
        max_records: 100,
        max_bytes: 1 << 20,
    });
    let mut db = Database::create(config, "shop").unwrap();
    db.create_table("widgets", widgets_schema()).unwrap();

    let table = db.table_mut("widgets").unwrap();
    let inserted = table.insert(widget("a", 1.0)).unwrap();
    let id = inserted.get("id").unwrap().as_id().unwrap().to_string();

    let mut p1 = Row::new();
    p1.insert("price".to_string(), Value::Number(2.0));
    table.update(&id, p1).unwrap();
    let mut p2 = Row::new();
    p2.insert("price".to_string(), Value::Number(3.0));
    table.update(&id, p2).unwrap();

    table.flush().unwrap();
    table.clear_cache();
    let fetched = table.get(&id).unwrap().unwrap();
    assert_eq!(fetched.get("price"), Some(&Value::Number(3.0)));
}
