use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dbsync_core::{
    ColumnDescriptor, ConnectionSpec, DbError, DialectAdapter, EngineKind, IndexDescriptor,
    PlaceholderStyle, Row, RoutineDescriptor, RoutineKind, SqlDialect, TableDescriptor, Value,
};
use mysql::prelude::*;
use mysql::{Opts, OptsBuilder, Pool, PooledConn};

/// MySQL/MariaDB's SQL dialect: backtick-quoted identifiers, `?`
/// placeholders, no native `RETURNING` support.
pub struct MysqlDialect;

impl SqlDialect for MysqlDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn qualified_table(&self, schema: Option<&str>, table: &str) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote_identifier(s), self.quote_identifier(table)),
            None => self.quote_identifier(table),
        }
    }

    fn value_to_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_nan() || f.is_infinite() {
                    "NULL".to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Text(s) => format!("'{}'", self.escape_string(s)),
            Value::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("X'{}'", hex)
            }
            Value::Json(s) => format!("'{}'", self.escape_string(s)),
            Value::Decimal(s) => format!("'{}'", self.escape_string(s)),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
        }
    }

    fn escape_string(&self, s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('\'', "\\'")
            .replace('"', "\\\"")
            .replace('\0', "\\0")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn supports_returning(&self) -> bool {
        false
    }
}

/// MySQL [`DialectAdapter`]. `mysql::Pool` is already bounded and
/// connection-checking on its own, so unlike the PostgreSQL adapter this
/// one leans on the driver's native pool rather than `r2d2`. Every blocking
/// `mysql` call still runs inside `spawn_blocking` so the async engine
/// never stalls a worker thread on it.
pub struct MysqlAdapter {
    spec: ConnectionSpec,
    dialect: MysqlDialect,
    pool: RwLock<Option<Pool>>,
}

impl MysqlAdapter {
    pub fn new(spec: ConnectionSpec) -> Self {
        Self {
            spec,
            dialect: MysqlDialect,
            pool: RwLock::new(None),
        }
    }

    fn opts(&self) -> Opts {
        Opts::from(
            OptsBuilder::new()
                .ip_or_hostname(Some(self.spec.host.clone()))
                .tcp_port(self.spec.port)
                .user(Some(self.spec.user.clone()))
                .pass(Some(self.spec.password.clone()))
                .db_name(Some(self.spec.database.clone())),
        )
    }

    fn pool(&self) -> Result<Pool, DbError> {
        self.pool
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| DbError::connection_failed("adapter not connected"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut PooledConn) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool()?;
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get_conn()
                .map_err(|e| DbError::connection_failed(format!("pool exhausted: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| DbError::Fatal(format!("blocking task panicked: {e}")))?
    }
}

#[async_trait]
impl DialectAdapter for MysqlAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    async fn connect(&self) -> Result<(), DbError> {
        let opts = self.opts();
        let pool = tokio::task::spawn_blocking(move || {
            let pool = Pool::new(opts)
                .map_err(|e| DbError::connection_failed(format!("{e}")))?;
            let mut conn = pool
                .get_conn()
                .map_err(|e| DbError::connection_failed(format!("{e}")))?;
            conn.query_drop("SELECT 1")
                .map_err(|e| DbError::connection_failed(format!("validation query failed: {e}")))?;
            Ok::<_, DbError>(pool)
        })
        .await
        .map_err(|e| DbError::Fatal(format!("blocking task panicked: {e}")))??;

        *self.pool.write().unwrap() = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<(), DbError> {
        *self.pool.write().unwrap() = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.pool.read().unwrap().is_some()
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DbError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let bound = bind_params(&params);
            let rows: Vec<mysql::Row> = conn
                .exec(sql.as_str(), bound)
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            Ok(rows.iter().map(row_to_values).collect())
        })
        .await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_conn(move |conn| {
            let bound = bind_params(&params);
            conn.exec_drop(sql.as_str(), bound)
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            Ok(conn.affected_rows())
        })
        .await
    }

    async fn get_tables(&self) -> Result<Vec<TableDescriptor>, DbError> {
        let database = self.spec.database.clone();
        let names = self
            .with_conn(move |conn| {
                let rows: Vec<String> = conn
                    .exec(
                        "SELECT table_name FROM information_schema.tables \
                         WHERE table_schema = ? AND table_type = 'BASE TABLE' \
                         ORDER BY table_name",
                        (database,),
                    )
                    .map_err(|e| DbError::query_failed(e.to_string()))?;
                Ok(rows)
            })
            .await?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.get_columns(&name).await?;
            let indexes = self.get_indexes(&name).await?;
            let create_statement = self.show_create_table(&name).await?;
            tables.push(TableDescriptor {
                name,
                columns,
                indexes,
                create_statement,
            });
        }
        Ok(tables)
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>, DbError> {
        let database = self.spec.database.clone();
        let table = table.to_string();
        self.with_conn(move |conn| {
            let rows: Vec<(String, String, String, Option<String>, String, String)> = conn
                .exec(
                    "SELECT column_name, column_type, is_nullable, column_default, \
                            column_key, extra \
                     FROM information_schema.columns \
                     WHERE table_schema = ? AND table_name = ? \
                     ORDER BY ordinal_position",
                    (database, table),
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            Ok(rows
                .into_iter()
                .map(|(name, type_name, nullable, default, key, extra)| ColumnDescriptor {
                    name,
                    type_name,
                    nullable: nullable == "YES",
                    default_expr: default,
                    extra,
                    is_primary_key: key == "PRI",
                })
                .collect())
        })
        .await
    }

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>, DbError> {
        let database = self.spec.database.clone();
        let table = table.to_string();
        self.with_conn(move |conn| {
            let rows: Vec<mysql::Row> = conn
                .exec(
                    format!(
                        "SHOW INDEX FROM {}.{}",
                        MysqlDialect.quote_identifier(&database),
                        MysqlDialect.quote_identifier(&table)
                    ),
                    (),
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            let mut by_name: std::collections::HashMap<String, IndexDescriptor> =
                std::collections::HashMap::new();
            for row in rows {
                let key_name: String = row.get("Key_name").unwrap_or_default();
                if key_name == "PRIMARY" {
                    continue;
                }
                let column_name: String = row.get("Column_name").unwrap_or_default();
                let non_unique: i64 = row.get("Non_unique").unwrap_or(1);
                let index_type: String = row.get("Index_type").unwrap_or_default();
                let entry = by_name.entry(key_name.clone()).or_insert_with(|| IndexDescriptor {
                    name: key_name,
                    unique: non_unique == 0,
                    columns: Vec::new(),
                    index_type,
                });
                entry.columns.push(column_name);
            }

            let mut indexes: Vec<IndexDescriptor> = by_name.into_values().collect();
            indexes.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(indexes)
        })
        .await
    }

    async fn get_primary_key(&self, table: &str) -> Result<Option<String>, DbError> {
        let database = self.spec.database.clone();
        let table = table.to_string();
        self.with_conn(move |conn| {
            let rows: Vec<String> = conn
                .exec(
                    "SELECT column_name FROM information_schema.columns \
                     WHERE table_schema = ? AND table_name = ? AND column_key = 'PRI'",
                    (database, table),
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            if rows.len() == 1 {
                Ok(Some(rows[0].clone()))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn get_procedures(&self, kind: RoutineKind) -> Result<Vec<RoutineDescriptor>, DbError> {
        let routine_type = match kind {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Trigger => return self.get_triggers().await,
        };
        let database = self.spec.database.clone();
        let routine_type_owned = routine_type.to_string();
        let names: Vec<String> = self
            .with_conn({
                let routine_type_owned = routine_type_owned.clone();
                move |conn| {
                    conn.exec(
                        "SELECT routine_name FROM information_schema.routines \
                         WHERE routine_schema = ? AND routine_type = ?",
                        (database, routine_type_owned),
                    )
                    .map_err(|e| DbError::query_failed(e.to_string()))
                }
            })
            .await?;

        let mut routines = Vec::with_capacity(names.len());
        for name in names {
            let create_statement = self.show_create_routine(&name, routine_type).await?;
            routines.push(RoutineDescriptor {
                name,
                kind,
                create_statement,
            });
        }
        Ok(routines)
    }

    async fn get_triggers(&self) -> Result<Vec<RoutineDescriptor>, DbError> {
        let database = self.spec.database.clone();
        let names: Vec<String> = self
            .with_conn(move |conn| {
                conn.exec(
                    "SELECT trigger_name FROM information_schema.triggers \
                     WHERE trigger_schema = ? ORDER BY trigger_name",
                    (database,),
                )
                .map_err(|e| DbError::query_failed(e.to_string()))
            })
            .await?;

        let mut triggers = Vec::with_capacity(names.len());
        for name in names {
            let create_statement = self.show_create_trigger(&name).await?;
            triggers.push(RoutineDescriptor {
                name,
                kind: RoutineKind::Trigger,
                create_statement,
            });
        }
        Ok(triggers)
    }

    async fn create_table(&self, ddl: &str) -> Result<(), DbError> {
        self.execute(ddl, &[]).await.map(|_| ())
    }

    async fn alter_table(&self, ddl: &str) -> Result<(), DbError> {
        self.execute(ddl, &[]).await.map(|_| ())
    }

    async fn drop_table(&self, name: &str) -> Result<(), DbError> {
        let sql = format!("DROP TABLE IF EXISTS {}", self.dialect.quote_identifier(name));
        self.execute(&sql, &[]).await.map(|_| ())
    }

    async fn truncate_table(&self, name: &str) -> Result<(), DbError> {
        let sql = format!("TRUNCATE TABLE {}", self.dialect.quote_identifier(name));
        self.execute(&sql, &[]).await.map(|_| ())
    }

    async fn count_rows(&self, table: &str) -> Result<u64, DbError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.dialect.quote_identifier(table));
        let rows = self.query(&sql, &[]).await?;
        match rows.first().and_then(|r| r.first()) {
            Some(Value::Int(n)) => Ok(*n as u64),
            _ => Ok(0),
        }
    }

    async fn select_all(&self, table: &str) -> Result<Vec<Row>, DbError> {
        let sql = format!("SELECT * FROM {}", self.dialect.quote_identifier(table));
        self.query(&sql, &[]).await
    }

    async fn select_where_gt(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Row>, DbError> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} > {}",
            self.dialect.quote_identifier(table),
            self.dialect.quote_identifier(column),
            self.dialect.placeholder_at(0),
        );
        self.query(&sql, std::slice::from_ref(value)).await
    }

    async fn select_column(&self, table: &str, column: &str) -> Result<Vec<Value>, DbError> {
        let sql = format!(
            "SELECT {} FROM {}",
            self.dialect.quote_identifier(column),
            self.dialect.quote_identifier(table)
        );
        let rows = self.query(&sql, &[]).await?;
        Ok(rows.into_iter().filter_map(|mut r| r.pop()).collect())
    }

    async fn select_by_keys(
        &self,
        table: &str,
        pk: &str,
        keys: &[Value],
    ) -> Result<Vec<Row>, DbError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE {} IN ({})",
            self.dialect.quote_identifier(table),
            self.dialect.quote_identifier(pk),
            self.dialect.placeholder_list(keys.len()),
        );
        self.query(&sql, keys).await
    }

    async fn insert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut affected = 0;
        for row in rows {
            let placeholders = self.dialect.placeholder_list(row.len());
            let sql = format!(
                "REPLACE INTO {} ({}) VALUES ({})",
                self.dialect.quote_identifier(table),
                column_list,
                placeholders
            );
            affected += self.execute(&sql, row).await?;
        }
        Ok(affected)
    }

    async fn upsert_rows(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Row],
        primary_key: &str,
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let column_list = columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let update_list = columns
            .iter()
            .filter(|c| c.as_str() != primary_key)
            .map(|c| {
                let q = self.dialect.quote_identifier(c);
                format!("{} = VALUES({})", q, q)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut affected = 0;
        for row in rows {
            let placeholders = self.dialect.placeholder_list(row.len());
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                self.dialect.quote_identifier(table),
                column_list,
                placeholders,
                update_list,
            );
            affected += self.execute(&sql, row).await?;
        }
        Ok(affected)
    }

    async fn delete_by_keys(&self, table: &str, pk: &str, keys: &[Value]) -> Result<u64, DbError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            self.dialect.quote_identifier(table),
            self.dialect.quote_identifier(pk),
            self.dialect.placeholder_list(keys.len()),
        );
        self.execute(&sql, keys).await
    }
}

impl MysqlAdapter {
    /// MySQL reports canonical DDL directly; unlike the PostgreSQL adapter
    /// there's no need to synthesize a CREATE TABLE from column metadata.
    async fn show_create_table(&self, table: &str) -> Result<String, DbError> {
        let table = table.to_string();
        self.with_conn(move |conn| {
            let quoted = MysqlDialect.quote_identifier(&table);
            let row: Option<(String, String)> = conn
                .exec_first(format!("SHOW CREATE TABLE {quoted}"), ())
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            row.map(|(_, ddl)| ddl)
                .ok_or_else(|| DbError::query_failed(format!("table {table} not found")))
        })
        .await
    }

    async fn show_create_routine(
        &self,
        name: &str,
        routine_type: &str,
    ) -> Result<String, DbError> {
        let name = name.to_string();
        let quoted = self.dialect.quote_identifier(&name);
        let statement = format!("SHOW CREATE {routine_type} {quoted}");
        let ddl_column = if routine_type == "PROCEDURE" {
            "Create Procedure"
        } else {
            "Create Function"
        };
        self.with_conn(move |conn| {
            let row = conn
                .query_first::<mysql::Row, _>(statement)
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            let row = row.ok_or_else(|| DbError::query_failed(format!("routine {name} not found")))?;
            row.get(ddl_column)
                .ok_or_else(|| DbError::query_failed("missing CREATE statement column"))
        })
        .await
    }

    async fn show_create_trigger(&self, name: &str) -> Result<String, DbError> {
        let name = name.to_string();
        let quoted = self.dialect.quote_identifier(&name);
        let statement = format!("SHOW CREATE TRIGGER {quoted}");
        self.with_conn(move |conn| {
            let row = conn
                .query_first::<mysql::Row, _>(statement)
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            let row = row.ok_or_else(|| DbError::query_failed(format!("trigger {name} not found")))?;
            row.get("SQL Original Statement")
                .ok_or_else(|| DbError::query_failed("missing CREATE statement column"))
        })
        .await
    }
}

fn bind_params(params: &[Value]) -> Vec<mysql::Value> {
    params.iter().map(value_to_mysql_param).collect()
}

fn value_to_mysql_param(value: &Value) -> mysql::Value {
    match value {
        Value::Null => mysql::Value::NULL,
        Value::Bool(b) => mysql::Value::Int(if *b { 1 } else { 0 }),
        Value::Int(i) => mysql::Value::Int(*i),
        Value::Float(f) => mysql::Value::Double(*f),
        Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => mysql::Value::Bytes(b.clone()),
        Value::Json(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::Decimal(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        Value::DateTime(dt) => mysql::Value::Date(
            dt.date_naive().format("%Y").to_string().parse().unwrap_or(0),
            dt.date_naive().format("%m").to_string().parse().unwrap_or(0),
            dt.date_naive().format("%d").to_string().parse().unwrap_or(0),
            dt.time().format("%H").to_string().parse().unwrap_or(0),
            dt.time().format("%M").to_string().parse().unwrap_or(0),
            dt.time().format("%S").to_string().parse().unwrap_or(0),
            0,
        ),
        Value::Date(d) => mysql::Value::Date(
            d.format("%Y").to_string().parse().unwrap_or(0),
            d.format("%m").to_string().parse().unwrap_or(0),
            d.format("%d").to_string().parse().unwrap_or(0),
            0,
            0,
            0,
            0,
        ),
        Value::Time(t) => mysql::Value::Time(
            false,
            0,
            t.format("%H").to_string().parse().unwrap_or(0),
            t.format("%M").to_string().parse().unwrap_or(0),
            t.format("%S").to_string().parse().unwrap_or(0),
            0,
        ),
    }
}

fn row_to_values(row: &mysql::Row) -> Row {
    let columns = row.columns_ref().to_vec();
    (0..row.len())
        .map(|idx| mysql_value_to_value(row, idx, &columns[idx]))
        .collect()
}

/// MySQL only reports a column's Rust-side type through [`mysql::Column`]
/// flags, so unlike PostgreSQL this has to branch on column metadata
/// rather than a type-name string.
fn mysql_value_to_value(row: &mysql::Row, idx: usize, col: &mysql::Column) -> Value {
    use mysql::consts::{ColumnFlags, ColumnType};

    let col_type = col.column_type();

    if col_type == ColumnType::MYSQL_TYPE_TINY && col.column_length() == 1 {
        return match row.get_opt::<Option<i8>, _>(idx) {
            Some(Ok(Some(v))) => Value::Bool(v != 0),
            Some(Ok(None)) => Value::Null,
            _ => Value::Null,
        };
    }

    if col_type == ColumnType::MYSQL_TYPE_LONGLONG && col.flags().contains(ColumnFlags::UNSIGNED_FLAG) {
        return match row.get_opt::<Option<u64>, _>(idx) {
            Some(Ok(Some(v))) => {
                if v <= i64::MAX as u64 {
                    Value::Int(v as i64)
                } else {
                    Value::Text(v.to_string())
                }
            }
            Some(Ok(None)) => Value::Null,
            _ => Value::Null,
        };
    }

    if matches!(
        col_type,
        ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP
    ) {
        return match row.as_ref(idx) {
            Some(mysql::Value::Date(year, month, day, hour, min, sec, micro)) => {
                match (
                    NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32),
                    NaiveTime::from_hms_micro_opt(*hour as u32, *min as u32, *sec as u32, *micro),
                ) {
                    (Some(date), Some(time)) => Value::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(
                        chrono::NaiveDateTime::new(date, time),
                        Utc,
                    )),
                    _ => Value::Text(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, min, sec
                    )),
                }
            }
            Some(mysql::Value::NULL) => Value::Null,
            Some(mysql::Value::Bytes(bytes)) => String::from_utf8(bytes.clone())
                .map(Value::Text)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }

    if col_type == ColumnType::MYSQL_TYPE_DATE {
        return match row.as_ref(idx) {
            Some(mysql::Value::Date(year, month, day, ..)) => {
                NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                    .map(Value::Date)
                    .unwrap_or_else(|| Value::Text(format!("{:04}-{:02}-{:02}", year, month, day)))
            }
            Some(mysql::Value::NULL) => Value::Null,
            Some(mysql::Value::Bytes(bytes)) => String::from_utf8(bytes.clone())
                .map(Value::Text)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }

    if col_type == ColumnType::MYSQL_TYPE_TIME {
        return match row.as_ref(idx) {
            Some(mysql::Value::Time(_neg, _days, hours, mins, secs, micros)) => {
                NaiveTime::from_hms_micro_opt(*hours as u32, *mins as u32, *secs as u32, *micros)
                    .map(Value::Time)
                    .unwrap_or_else(|| Value::Text(format!("{:02}:{:02}:{:02}", hours, mins, secs)))
            }
            Some(mysql::Value::NULL) => Value::Null,
            Some(mysql::Value::Bytes(bytes)) => String::from_utf8(bytes.clone())
                .map(Value::Text)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
    }

    if let Some(Ok(v)) = row.get_opt::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Some(Ok(v)) = row.get_opt::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Some(Ok(v)) = row.get_opt::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    if let Some(Ok(v)) = row.get_opt::<Option<Vec<u8>>, _>(idx) {
        return v.map(Value::Bytes).unwrap_or(Value::Null);
    }

    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers_with_backticks_and_escapes_embedded_backticks() {
        let dialect = MysqlDialect;
        assert_eq!(dialect.quote_identifier("orders"), "`orders`");
        assert_eq!(dialect.quote_identifier("weird`name"), "`weird``name`");
    }

    #[test]
    fn placeholder_style_is_question_mark() {
        let dialect = MysqlDialect;
        assert_eq!(dialect.placeholder_at(0), "?");
        assert_eq!(dialect.placeholder_list(3), "?, ?, ?");
    }

    #[test]
    fn does_not_support_returning() {
        assert!(!MysqlDialect.supports_returning());
    }

    #[test]
    fn escapes_single_quotes_in_text_literals() {
        let dialect = MysqlDialect;
        assert_eq!(dialect.value_to_literal(&Value::Text("O'Brien".into())), "'O\\'Brien'");
    }

    #[test]
    fn renders_bytes_as_hex_literal() {
        let dialect = MysqlDialect;
        assert_eq!(dialect.value_to_literal(&Value::Bytes(vec![0xde, 0xad])), "X'dead'");
    }
}
