use async_trait::async_trait;

use crate::{
    ColumnDescriptor, DbError, EngineKind, Row, RoutineDescriptor, RoutineKind, SqlDialect,
    TableDescriptor, Value,
};

/// The one boundary where dialect differences live (§4.1, §9). Every
/// operation that reads from or writes to a database flows through this
/// trait; the rest of the engine is oblivious to whether it's talking to
/// MySQL or PostgreSQL.
///
/// Implementations own a bounded connection pool internally; callers never
/// see raw connections. Avoid branching on the concrete adapter type — use
/// [`DialectAdapter::dialect`] as the single discriminator (§9).
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// Which engine this adapter talks to.
    fn engine(&self) -> EngineKind;

    /// The SQL dialect (quoting, placeholders, literals) for this adapter.
    fn dialect(&self) -> &dyn SqlDialect;

    /// Open the bounded connection pool (default 10 connections) and
    /// validate it by acquiring and releasing one connection.
    ///
    /// Fails with `DbError::ConnectionFailed` on any networking or
    /// authentication error.
    async fn connect(&self) -> Result<(), DbError>;

    /// Tear down the pool. Safe to call on an adapter that never connected.
    async fn close(&self) -> Result<(), DbError>;

    /// Whether the pool currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// Escape an identifier for safe embedding in generated SQL (doubles the
    /// engine's quote character and wraps it). Delegates to
    /// [`SqlDialect::quote_identifier`].
    fn escape_identifier(&self, name: &str) -> String {
        self.dialect().quote_identifier(name)
    }

    /// Run a parameterized query. Fails with `DbError::QueryFailed` on
    /// server error.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError>;

    /// Run a statement that doesn't return rows (DDL, DML without a result
    /// set needed), returning the affected-row count where the engine
    /// reports one.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError>;

    /// List base tables in the current database/schema, each with a
    /// computed canonical CREATE statement (§4.1).
    async fn get_tables(&self) -> Result<Vec<TableDescriptor>, DbError>;

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DbError>;

    async fn get_indexes(&self, table: &str) -> Result<Vec<crate::IndexDescriptor>, DbError>;

    /// The single-column primary key name, if the table has one composed of
    /// exactly one column. Tables with composite or absent primary keys
    /// return `None`; the caller treats that as "no primary key" for
    /// reconciliation purposes.
    async fn get_primary_key(&self, table: &str) -> Result<Option<String>, DbError>;

    /// Stored procedures or functions, by kind. Triggers use
    /// [`DialectAdapter::get_triggers`] instead.
    async fn get_procedures(&self, kind: RoutineKind) -> Result<Vec<RoutineDescriptor>, DbError>;

    async fn get_triggers(&self) -> Result<Vec<RoutineDescriptor>, DbError>;

    async fn create_table(&self, ddl: &str) -> Result<(), DbError>;

    async fn alter_table(&self, ddl: &str) -> Result<(), DbError>;

    async fn drop_table(&self, name: &str) -> Result<(), DbError>;

    async fn truncate_table(&self, name: &str) -> Result<(), DbError>;

    async fn count_rows(&self, table: &str) -> Result<u64, DbError>;

    async fn select_all(&self, table: &str) -> Result<Vec<Row>, DbError>;

    /// Rows where `column > value`, used for witness-column timestamp
    /// windows and primary-key set scans (§4.2).
    async fn select_where_gt(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>, DbError>;

    /// Select only `column` for every row — used to build the primary-key
    /// sets `S` and `T` in PK-reconciliation (§4.2) without pulling whole
    /// rows across the wire.
    async fn select_column(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError>;

    /// Select full rows whose primary key is in `keys`.
    async fn select_by_keys(
        &self,
        table: &str,
        pk: &str,
        keys: &[Value],
    ) -> Result<Vec<Row>, DbError>;

    /// Bulk-load rows with truncate-then-load overwrite semantics.
    /// MySQL: `REPLACE INTO`. PostgreSQL: plain `INSERT`.
    ///
    /// `columns` names every positional slot in each row of `rows`.
    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<u64, DbError>;

    /// Upsert rows keyed by `primary_key`.
    /// MySQL: `INSERT ... ON DUPLICATE KEY UPDATE`.
    /// PostgreSQL: `INSERT ... ON CONFLICT(pk) DO UPDATE SET ...`.
    async fn upsert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        primary_key: &str,
    ) -> Result<u64, DbError>;

    /// Delete rows whose primary key is in `keys`. Callers batch `keys` at
    /// 100 per call (§4.2, §8).
    async fn delete_by_keys(&self, table: &str, pk: &str, keys: &[Value]) -> Result<u64, DbError>;
}
