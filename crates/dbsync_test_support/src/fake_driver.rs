use async_trait::async_trait;
use dbsync_core::{
    ColumnDescriptor, DbError, DefaultSqlDialect, DialectAdapter, EngineKind, IndexDescriptor, Row,
    RoutineDescriptor, RoutineKind, SqlDialect, TableDescriptor, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Default)]
pub struct FakeAdapterStats {
    pub executed_statements: Vec<String>,
    pub connect_calls: usize,
    pub close_calls: usize,
}

#[derive(Default)]
struct FakeAdapterState {
    tables: RwLock<Vec<TableDescriptor>>,
    procedures: RwLock<Vec<RoutineDescriptor>>,
    triggers: RwLock<Vec<RoutineDescriptor>>,
    rows: RwLock<HashMap<String, Vec<Row>>>,
    executed_statements: Mutex<Vec<String>>,
    connect_calls: std::sync::atomic::AtomicUsize,
    close_calls: std::sync::atomic::AtomicUsize,
    connect_error: RwLock<Option<String>>,
    connected: AtomicBool,
}

/// Deterministic in-memory [`DialectAdapter`] used by engine and worker
/// unit tests in place of a live MySQL/PostgreSQL connection.
#[derive(Clone)]
pub struct FakeAdapter {
    engine: EngineKind,
    dialect: DefaultSqlDialect,
    state: std::sync::Arc<FakeAdapterState>,
}

impl FakeAdapter {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            dialect: DefaultSqlDialect,
            state: std::sync::Arc::new(FakeAdapterState::default()),
        }
    }

    pub fn with_tables(self, tables: Vec<TableDescriptor>) -> Self {
        *rwlock_write(&self.state.tables) = tables;
        self
    }

    pub fn with_procedures(self, procedures: Vec<RoutineDescriptor>) -> Self {
        *rwlock_write(&self.state.procedures) = procedures;
        self
    }

    pub fn with_triggers(self, triggers: Vec<RoutineDescriptor>) -> Self {
        *rwlock_write(&self.state.triggers) = triggers;
        self
    }

    pub fn with_rows(self, table: impl Into<String>, rows: Vec<Row>) -> Self {
        rwlock_write(&self.state.rows).insert(table.into(), rows);
        self
    }

    pub fn with_connect_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.connect_error) = Some(message.into());
        self
    }

    pub fn stats(&self) -> FakeAdapterStats {
        FakeAdapterStats {
            executed_statements: mutex_lock(&self.state.executed_statements).clone(),
            connect_calls: self.state.connect_calls.load(Ordering::Relaxed),
            close_calls: self.state.close_calls.load(Ordering::Relaxed),
        }
    }

    fn record(&self, statement: impl Into<String>) {
        mutex_lock(&self.state.executed_statements).push(statement.into());
    }

    fn rows_for(&self, table: &str) -> Vec<Row> {
        rwlock_read(&self.state.rows).get(table).cloned().unwrap_or_default()
    }

    fn table(&self, name: &str) -> Option<TableDescriptor> {
        rwlock_read(&self.state.tables)
            .iter()
            .find(|t| t.name == name)
            .cloned()
    }
}

#[async_trait]
impl DialectAdapter for FakeAdapter {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    async fn connect(&self) -> Result<(), DbError> {
        self.state.connect_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = rwlock_read(&self.state.connect_error).clone() {
            return Err(DbError::connection_failed(message));
        }
        self.state.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), DbError> {
        self.state.close_calls.fetch_add(1, Ordering::Relaxed);
        self.state.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, DbError> {
        self.record(sql);
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<u64, DbError> {
        self.record(sql);
        Ok(0)
    }

    async fn get_tables(&self) -> Result<Vec<TableDescriptor>, DbError> {
        Ok(rwlock_read(&self.state.tables).clone())
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DbError> {
        Ok(self.table(table).map(|t| t.columns).unwrap_or_default())
    }

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>, DbError> {
        Ok(self.table(table).map(|t| t.indexes).unwrap_or_default())
    }

    async fn get_primary_key(&self, table: &str) -> Result<Option<String>, DbError> {
        Ok(self
            .table(table)
            .and_then(|t| t.primary_key_column().map(|c| c.to_string())))
    }

    async fn get_procedures(&self, kind: RoutineKind) -> Result<Vec<RoutineDescriptor>, DbError> {
        if kind == RoutineKind::Trigger {
            return self.get_triggers().await;
        }
        Ok(rwlock_read(&self.state.procedures)
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn get_triggers(&self) -> Result<Vec<RoutineDescriptor>, DbError> {
        Ok(rwlock_read(&self.state.triggers).clone())
    }

    async fn create_table(&self, ddl: &str) -> Result<(), DbError> {
        self.record(ddl);
        Ok(())
    }

    async fn alter_table(&self, ddl: &str) -> Result<(), DbError> {
        self.record(ddl);
        Ok(())
    }

    async fn drop_table(&self, name: &str) -> Result<(), DbError> {
        rwlock_write(&self.state.tables).retain(|t| t.name != name);
        Ok(())
    }

    async fn truncate_table(&self, name: &str) -> Result<(), DbError> {
        rwlock_write(&self.state.rows).insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        Ok(self.rows_for(table).len() as u64)
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Row>, DbError> {
        Ok(self.rows_for(table))
    }

    async fn select_where_gt(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>, DbError> {
        let descriptor = self
            .table(table)
            .ok_or_else(|| DbError::missing_key(table))?;
        let idx = descriptor
            .column(column)
            .and_then(|_| descriptor.columns.iter().position(|c| c.name == column))
            .ok_or_else(|| DbError::missing_key(column))?;
        Ok(self
            .rows_for(table)
            .into_iter()
            .filter(|row| row.get(idx).map(|v| v > value).unwrap_or(false))
            .collect())
    }

    async fn select_column(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError> {
        let descriptor = self
            .table(table)
            .ok_or_else(|| DbError::missing_key(table))?;
        let idx = descriptor
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| DbError::missing_key(column))?;
        Ok(self
            .rows_for(table)
            .into_iter()
            .filter_map(|row| row.get(idx).cloned())
            .collect())
    }

    async fn select_by_keys(
        &self,
        table: &str,
        pk: &str,
        keys: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        let descriptor = self
            .table(table)
            .ok_or_else(|| DbError::missing_key(table))?;
        let idx = descriptor
            .columns
            .iter()
            .position(|c| c.name == pk)
            .ok_or_else(|| DbError::missing_key(pk))?;
        Ok(self
            .rows_for(table)
            .into_iter()
            .filter(|row| row.get(idx).map(|v| keys.contains(v)).unwrap_or(false))
            .collect())
    }

    async fn insert_rows(
        &self,
        table: &str,
        _columns: &[String],
        rows: &[Row],
    ) -> Result<u64, DbError> {
        let mut store = rwlock_write(&self.state.rows);
        let entry = store.entry(table.to_string()).or_default();
        entry.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn upsert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        primary_key: &str,
    ) -> Result<u64, DbError> {
        let pk_idx = columns
            .iter()
            .position(|c| c == primary_key)
            .ok_or_else(|| DbError::missing_key(primary_key))?;
        let mut store = rwlock_write(&self.state.rows);
        let entry = store.entry(table.to_string()).or_default();
        for row in rows {
            let key = &row[pk_idx];
            if let Some(existing) = entry.iter_mut().find(|r| &r[pk_idx] == key) {
                *existing = row.clone();
            } else {
                entry.push(row.clone());
            }
        }
        Ok(rows.len() as u64)
    }

    async fn delete_by_keys(&self, table: &str, pk: &str, keys: &[Value]) -> Result<u64, DbError> {
        let descriptor = self
            .table(table)
            .ok_or_else(|| DbError::missing_key(table))?;
        let idx = descriptor
            .columns
            .iter()
            .position(|c| c.name == pk)
            .ok_or_else(|| DbError::missing_key(pk))?;
        let mut store = rwlock_write(&self.state.rows);
        let entry = store.entry(table.to_string()).or_default();
        let before = entry.len();
        entry.retain(|row| !row.get(idx).map(|v| keys.contains(v)).unwrap_or(false));
        Ok((before - entry.len()) as u64)
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn users_table() -> TableDescriptor {
        fixtures::table(
            "users",
            vec![
                fixtures::column("id", "int", true),
                fixtures::column("updated_at", "timestamp", false),
            ],
        )
    }

    #[tokio::test]
    async fn connect_fails_with_configured_error() {
        let adapter = FakeAdapter::new(EngineKind::Postgresql).with_connect_error("boom");
        let result = adapter.connect().await;
        assert!(matches!(result, Err(DbError::ConnectionFailed(_))));
        assert!(!adapter.is_connected());
    }

    #[tokio::test]
    async fn insert_then_select_all_round_trips() {
        let adapter = FakeAdapter::new(EngineKind::Mysql).with_tables(vec![users_table()]);
        adapter.connect().await.unwrap();

        let row = fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("2024-01-01")]);
        adapter
            .insert_rows("users", &["id".into(), "updated_at".into()], &[row.clone()])
            .await
            .unwrap();

        let rows = adapter.select_all("users").await.unwrap();
        assert_eq!(rows, vec![row]);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row_by_primary_key() {
        let adapter = FakeAdapter::new(EngineKind::Mysql).with_tables(vec![users_table()]);
        let columns = vec!["id".to_string(), "updated_at".to_string()];

        adapter
            .upsert_rows(
                "users",
                &columns,
                &[fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("a")])],
                "id",
            )
            .await
            .unwrap();
        adapter
            .upsert_rows(
                "users",
                &columns,
                &[fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("b")])],
                "id",
            )
            .await
            .unwrap();

        let rows = adapter.select_all("users").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], fixtures::text_cell("b"));
    }

    #[tokio::test]
    async fn delete_by_keys_removes_matching_rows_only() {
        let adapter = FakeAdapter::new(EngineKind::Mysql).with_tables(vec![users_table()]);
        adapter
            .insert_rows(
                "users",
                &["id".into(), "updated_at".into()],
                &[
                    fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("a")]),
                    fixtures::row(vec![fixtures::int_cell(2), fixtures::text_cell("b")]),
                ],
            )
            .await
            .unwrap();

        let deleted = adapter
            .delete_by_keys("users", "id", &[fixtures::int_cell(1)])
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        let remaining = adapter.select_all("users").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0][0], fixtures::int_cell(2));
    }
}
