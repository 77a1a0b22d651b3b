use std::time::Duration;

use dbsync_core::{ConnectionSpec, DialectAdapter, Value};
use dbsync_driver_postgres::PostgresAdapter;
use dbsync_test_support::containers;
use tokio::runtime::Runtime;

fn connect(rt: &Runtime, spec: ConnectionSpec) -> Result<PostgresAdapter, dbsync_core::DbError> {
    let adapter = PostgresAdapter::new(spec);
    containers::retry_db_operation(Duration::from_secs(30), || rt.block_on(adapter.connect()))?;
    Ok(adapter)
}

#[test]
#[ignore = "requires Docker daemon"]
fn connects_and_runs_a_trivial_query() -> Result<(), dbsync_core::DbError> {
    containers::with_postgres(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;
        let rows = rt.block_on(adapter.query("SELECT 1 AS one", &[]))?;
        assert_eq!(rows.len(), 1);
        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn creates_table_and_inserts_then_selects_rows() -> Result<(), dbsync_core::DbError> {
    containers::with_postgres(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        ))?;
        rt.block_on(adapter.insert_rows(
            "users",
            &["id".to_string(), "name".to_string()],
            &[
                vec![Value::Int(1), Value::Text("alice".into())],
                vec![Value::Int(2), Value::Text("bob".into())],
            ],
        ))?;

        let rows = rt.block_on(adapter.select_all("users"))?;
        assert_eq!(rows.len(), 2);
        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn introspects_columns_and_primary_key() -> Result<(), dbsync_core::DbError> {
    containers::with_postgres(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, total NUMERIC NOT NULL, updated_at TIMESTAMP)",
            &[],
        ))?;

        let columns = rt.block_on(adapter.get_columns("orders"))?;
        assert_eq!(columns.len(), 3);

        let pk = rt.block_on(adapter.get_primary_key("orders"))?;
        assert_eq!(pk.as_deref(), Some("id"));
        Ok(())
    })
}

#[test]
#[ignore = "requires Docker daemon"]
fn delete_by_keys_removes_only_matching_rows() -> Result<(), dbsync_core::DbError> {
    containers::with_postgres(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
            &[],
        ))?;
        rt.block_on(adapter.insert_rows(
            "items",
            &["id".to_string(), "label".to_string()],
            &[
                vec![Value::Int(1), Value::Text("a".into())],
                vec![Value::Int(2), Value::Text("b".into())],
                vec![Value::Int(3), Value::Text("c".into())],
            ],
        ))?;

        let affected = rt.block_on(adapter.delete_by_keys("items", "id", &[Value::Int(2)]))?;
        assert_eq!(affected, 1);

        let remaining = rt.block_on(adapter.count_rows("items"))?;
        assert_eq!(remaining, 2);
        Ok(())
    })
}
