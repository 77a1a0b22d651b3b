use std::time::Duration;

use dbsync_core::{ConnectionSpec, DialectAdapter, Value};
use dbsync_driver_mysql::MysqlAdapter;
use dbsync_test_support::containers;
use tokio::runtime::Runtime;

fn connect(rt: &Runtime, spec: ConnectionSpec) -> Result<MysqlAdapter, dbsync_core::DbError> {
    let adapter = MysqlAdapter::new(spec);
    containers::retry_db_operation(Duration::from_secs(30), || rt.block_on(adapter.connect()))?;
    Ok(adapter)
}

#[test]
#[ignore = "requires Docker daemon"]
fn connects_and_runs_a_trivial_query() -> Result<(), dbsync_core::DbError> {
    containers::with_mysql(|spec| {
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
    containers::with_mysql(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50) NOT NULL)",
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
    containers::with_mysql(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE orders (id INT PRIMARY KEY, total DECIMAL(10,2) NOT NULL, updated_at TIMESTAMP NULL)",
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
fn upsert_rows_updates_existing_keys_in_place() -> Result<(), dbsync_core::DbError> {
    containers::with_mysql(|spec| {
        let rt = Runtime::new().unwrap();
        let adapter = connect(&rt, spec)?;

        rt.block_on(adapter.execute(
            "CREATE TABLE items (id INT PRIMARY KEY, label VARCHAR(50) NOT NULL)",
            &[],
        ))?;
        rt.block_on(adapter.insert_rows(
            "items",
            &["id".to_string(), "label".to_string()],
            &[vec![Value::Int(1), Value::Text("old".into())]],
        ))?;

        rt.block_on(adapter.upsert_rows(
            "items",
            &["id".to_string(), "label".to_string()],
            &[vec![Value::Int(1), Value::Text("new".into())]],
            "id",
        ))?;

        let rows = rt.block_on(adapter.select_all("items"))?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], Value::Text("new".into()));
        Ok(())
    })
}
