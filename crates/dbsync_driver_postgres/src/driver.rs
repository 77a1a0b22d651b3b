use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use dbsync_core::{
    ColumnDescriptor, ConnectionSpec, DbError, DialectAdapter, EngineKind, IndexDescriptor,
    PlaceholderStyle, Row, RoutineDescriptor, RoutineKind, SqlDialect, TableDescriptor, Value,
};
use postgres::{Client, NoTls, Row as PgRow};
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

/// PostgreSQL's SQL dialect: double-quoted identifiers, `$N` placeholders,
/// native `RETURNING` support.
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
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
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => format!("'{}'", self.escape_string(s)),
            Value::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
                format!("'\\x{}'", hex)
            }
            Value::Json(s) => format!("'{}'::jsonb", self.escape_string(s)),
            Value::Decimal(s) => s.clone(),
            Value::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f%:z")),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S%.f")),
        }
    }

    fn escape_string(&self, s: &str) -> String {
        s.replace('\'', "''")
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::DollarNumber
    }

    fn supports_returning(&self) -> bool {
        true
    }
}

type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// PostgreSQL [`DialectAdapter`]. Owns a bounded `r2d2` pool; `connect`
/// builds it, `close` drops it. Every blocking `postgres` call runs inside
/// `spawn_blocking` so the async engine never stalls a worker thread on it.
pub struct PostgresAdapter {
    spec: ConnectionSpec,
    dialect: PostgresDialect,
    pool: RwLock<Option<PgPool>>,
}

impl PostgresAdapter {
    pub fn new(spec: ConnectionSpec) -> Self {
        Self {
            spec,
            dialect: PostgresDialect,
            pool: RwLock::new(None),
        }
    }

    fn conninfo(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} connect_timeout=30",
            self.spec.host, self.spec.port, self.spec.user, self.spec.password, self.spec.database
        )
    }

    fn pool(&self) -> Result<PgPool, DbError> {
        self.pool
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| DbError::connection_failed("adapter not connected"))
    }

    async fn with_client<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Client) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool()?;
        tokio::task::spawn_blocking(move || {
            let mut client = pool
                .get()
                .map_err(|e| DbError::connection_failed(format!("pool exhausted: {e}")))?;
            f(&mut client)
        })
        .await
        .map_err(|e| DbError::Fatal(format!("blocking task panicked: {e}")))?
    }
}

#[async_trait]
impl DialectAdapter for PostgresAdapter {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgresql
    }

    fn dialect(&self) -> &dyn SqlDialect {
        &self.dialect
    }

    async fn connect(&self) -> Result<(), DbError> {
        let conninfo = self.conninfo();
        let pool = tokio::task::spawn_blocking(move || {
            let config = conninfo
                .parse()
                .map_err(|e| DbError::connection_failed(format!("invalid connection string: {e}")))?;
            let manager = PostgresConnectionManager::new(config, NoTls);
            Pool::builder()
                .max_size(10)
                .build(manager)
                .map_err(|e| DbError::connection_failed(format!("{e}")))
        })
        .await
        .map_err(|e| DbError::Fatal(format!("blocking task panicked: {e}")))??;

        {
            let mut client = pool
                .get()
                .map_err(|e| DbError::connection_failed(format!("pool exhausted: {e}")))?;
            client
                .simple_query("SELECT 1")
                .map_err(|e| DbError::connection_failed(format!("validation query failed: {e}")))?;
        }

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
        self.with_client(move |client| {
            let bound = bind_params(&params);
            let refs = param_refs(&bound);
            let rows = client
                .query(sql.as_str(), &refs)
                .map_err(|e| DbError::query_failed(e.to_string()))?;
            Ok(rows.iter().map(row_to_values).collect())
        })
        .await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, DbError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_client(move |client| {
            let bound = bind_params(&params);
            let refs = param_refs(&bound);
            client
                .execute(sql.as_str(), &refs)
                .map_err(|e| DbError::query_failed(e.to_string()))
        })
        .await
    }

    async fn get_tables(&self) -> Result<Vec<TableDescriptor>, DbError> {
        let names = self
            .with_client(|client| {
                let rows = client
                    .query(
                        "SELECT table_name FROM information_schema.tables \
                         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
                         ORDER BY table_name",
                        &[],
                    )
                    .map_err(|e| DbError::query_failed(e.to_string()))?;
                Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect::<Vec<_>>())
            })
            .await?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.get_columns(&name).await?;
            let indexes = self.get_indexes(&name).await?;
            let create_statement = synthesize_create_table(&name, &columns, &self.dialect);
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
        let table = table.to_string();
        self.with_client(move |client| {
            let rows = client
                .query(
                    "SELECT c.column_name, c.data_type, c.is_nullable = 'YES', \
                            c.column_default, \
                            COALESCE((SELECT true FROM information_schema.table_constraints tc \
                                      JOIN information_schema.key_column_usage kcu \
                                        ON tc.constraint_name = kcu.constraint_name \
                                       AND tc.table_schema = kcu.table_schema \
                                     WHERE tc.constraint_type = 'PRIMARY KEY' \
                                       AND tc.table_schema = c.table_schema \
                                       AND tc.table_name = c.table_name \
                                       AND kcu.column_name = c.column_name), false) \
                     FROM information_schema.columns c \
                     WHERE c.table_schema = 'public' AND c.table_name = $1 \
                     ORDER BY c.ordinal_position",
                    &[&table],
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            Ok(rows
                .iter()
                .map(|row| ColumnDescriptor {
                    name: row.get(0),
                    type_name: row.get(1),
                    nullable: row.get(2),
                    default_expr: row.get(3),
                    extra: String::new(),
                    is_primary_key: row.get(4),
                })
                .collect())
        })
        .await
    }

    async fn get_indexes(&self, table: &str) -> Result<Vec<IndexDescriptor>, DbError> {
        let table = table.to_string();
        self.with_client(move |client| {
            let rows = client
                .query(
                    "SELECT i.relname, array_agg(a.attname ORDER BY k.n), \
                            ix.indisunique, am.amname \
                     FROM pg_index ix \
                     JOIN pg_class i ON i.oid = ix.indexrelid \
                     JOIN pg_class t ON t.oid = ix.indrelid \
                     JOIN pg_namespace n ON n.oid = t.relnamespace \
                     JOIN pg_am am ON am.oid = i.relam \
                     JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, n) ON true \
                     JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
                     WHERE n.nspname = 'public' AND t.relname = $1 AND NOT ix.indisprimary \
                     GROUP BY i.relname, ix.indisunique, am.amname \
                     ORDER BY i.relname",
                    &[&table],
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            Ok(rows
                .iter()
                .map(|row| IndexDescriptor {
                    name: row.get(0),
                    columns: row.get(1),
                    unique: row.get(2),
                    index_type: row.get::<_, String>(3).to_uppercase(),
                })
                .collect())
        })
        .await
    }

    async fn get_primary_key(&self, table: &str) -> Result<Option<String>, DbError> {
        let table = table.to_string();
        self.with_client(move |client| {
            let rows = client
                .query(
                    "SELECT kcu.column_name \
                     FROM information_schema.table_constraints tc \
                     JOIN information_schema.key_column_usage kcu \
                       ON tc.constraint_name = kcu.constraint_name \
                      AND tc.table_schema = kcu.table_schema \
                     WHERE tc.constraint_type = 'PRIMARY KEY' \
                       AND tc.table_schema = 'public' AND tc.table_name = $1",
                    &[&table],
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            if rows.len() == 1 {
                Ok(Some(rows[0].get(0)))
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
        let routine_type = routine_type.to_string();
        self.with_client(move |client| {
            let rows = client
                .query(
                    "SELECT p.proname, pg_get_functiondef(p.oid) \
                     FROM pg_proc p \
                     JOIN pg_namespace n ON n.oid = p.pronamespace \
                     WHERE n.nspname = 'public' \
                       AND p.prokind = $1",
                    &[&if routine_type == "PROCEDURE" { "p" } else { "f" }],
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            Ok(rows
                .iter()
                .map(|row| RoutineDescriptor {
                    name: row.get(0),
                    kind: if routine_type == "PROCEDURE" {
                        RoutineKind::Procedure
                    } else {
                        RoutineKind::Function
                    },
                    create_statement: row.get(1),
                })
                .collect())
        })
        .await
    }

    async fn get_triggers(&self) -> Result<Vec<RoutineDescriptor>, DbError> {
        self.with_client(|client| {
            let rows = client
                .query(
                    "SELECT trigger_name, \
                            'CREATE TRIGGER ' || trigger_name || ' ' || action_timing || ' ' \
                            || event_manipulation || ' ON ' || event_object_table \
                            || ' FOR EACH ' || action_orientation || ' ' || action_statement \
                     FROM information_schema.triggers \
                     WHERE trigger_schema = 'public' \
                     ORDER BY trigger_name",
                    &[],
                )
                .map_err(|e| DbError::query_failed(e.to_string()))?;

            Ok(rows
                .iter()
                .map(|row| RoutineDescriptor {
                    name: row.get(0),
                    kind: RoutineKind::Trigger,
                    create_statement: row.get(1),
                })
                .collect())
        })
        .await
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
                "INSERT INTO {} ({}) VALUES ({})",
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
                format!("{} = EXCLUDED.{}", q, q)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut affected = 0;
        for row in rows {
            let placeholders = self.dialect.placeholder_list(row.len());
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {}",
                self.dialect.quote_identifier(table),
                column_list,
                placeholders,
                self.dialect.quote_identifier(primary_key),
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

fn synthesize_create_table(
    name: &str,
    columns: &[ColumnDescriptor],
    dialect: &PostgresDialect,
) -> String {
    let column_defs: Vec<String> = columns
        .iter()
        .map(|c| {
            let mut def = format!(
                "{} {}",
                dialect.quote_identifier(&c.name),
                c.type_name.to_uppercase()
            );
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &c.default_expr {
                def.push_str(&format!(" DEFAULT {}", default));
            }
            def
        })
        .collect();
    let pk_columns: Vec<String> = columns
        .iter()
        .filter(|c| c.is_primary_key)
        .map(|c| dialect.quote_identifier(&c.name))
        .collect();

    let mut body = column_defs.join(", ");
    if !pk_columns.is_empty() {
        body.push_str(&format!(", PRIMARY KEY ({})", pk_columns.join(", ")));
    }
    format!("CREATE TABLE {} ({})", dialect.quote_identifier(name), body)
}

/// postgres's `ToSql` trait needs concrete types at the call site, so bind
/// each [`Value`] through this boxed adapter rather than matching per call.
fn bind_params(params: &[Value]) -> Vec<Box<dyn postgres::types::ToSql + Sync>> {
    params
        .iter()
        .map(|v| -> Box<dyn postgres::types::ToSql + Sync> {
            match v {
                Value::Null => Box::new(Option::<i32>::None),
                Value::Bool(b) => Box::new(*b),
                Value::Int(i) => Box::new(*i),
                Value::Float(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.clone()),
                Value::Bytes(b) => Box::new(b.clone()),
                Value::Json(s) => Box::new(s.clone()),
                Value::Decimal(s) => Box::new(s.clone()),
                Value::DateTime(dt) => Box::new(*dt),
                Value::Date(d) => Box::new(*d),
                Value::Time(t) => Box::new(*t),
            }
        })
        .collect()
}

fn param_refs(bound: &[Box<dyn postgres::types::ToSql + Sync>]) -> Vec<&(dyn postgres::types::ToSql + Sync)> {
    bound.iter().map(|b| b.as_ref()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_core::ColumnDescriptor;

    #[test]
    fn quotes_identifiers_with_double_quotes_and_escapes_embedded_quotes() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.quote_identifier("orders"), "\"orders\"");
        assert_eq!(dialect.quote_identifier("weird\"name"), "\"weird\"\"name\"");
    }

    #[test]
    fn placeholder_style_is_dollar_number() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.placeholder_at(0), "$1");
        assert_eq!(dialect.placeholder_list(3), "$1, $2, $3");
    }

    #[test]
    fn supports_returning() {
        assert!(PostgresDialect.supports_returning());
    }

    #[test]
    fn escapes_single_quotes_in_text_literals() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.value_to_literal(&Value::Text("O'Brien".into())), "'O''Brien'");
    }

    #[test]
    fn renders_bytes_as_hex_literal() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.value_to_literal(&Value::Bytes(vec![0xde, 0xad])), "'\\xdead'");
    }

    #[test]
    fn synthesizes_create_table_with_primary_key_clause() {
        let columns = vec![
            ColumnDescriptor {
                name: "id".to_string(),
                type_name: "integer".to_string(),
                nullable: false,
                default_expr: None,
                extra: String::new(),
                is_primary_key: true,
            },
            ColumnDescriptor {
                name: "name".to_string(),
                type_name: "text".to_string(),
                nullable: true,
                default_expr: None,
                extra: String::new(),
                is_primary_key: false,
            },
        ];
        let ddl = synthesize_create_table("users", &columns, &PostgresDialect);
        assert_eq!(
            ddl,
            "CREATE TABLE \"users\" (\"id\" INTEGER NOT NULL, \"name\" TEXT, PRIMARY KEY (\"id\"))"
        );
    }
}

fn row_to_values(row: &PgRow) -> Row {
    (0..row.len())
        .map(|idx| pg_value_to_value(row, idx))
        .collect()
}

fn pg_value_to_value(row: &PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_().name();
    match type_name {
        "bool" => row.try_get::<_, bool>(idx).map(Value::Bool).unwrap_or(Value::Null),
        "int2" => row
            .try_get::<_, i16>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int4" => row
            .try_get::<_, i32>(idx)
            .map(|v| Value::Int(v as i64))
            .unwrap_or(Value::Null),
        "int8" => row.try_get::<_, i64>(idx).map(Value::Int).unwrap_or(Value::Null),
        "float4" => row
            .try_get::<_, f32>(idx)
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "float8" | "numeric" => row.try_get::<_, f64>(idx).map(Value::Float).unwrap_or(Value::Null),
        "bytea" => row.try_get::<_, Vec<u8>>(idx).map(Value::Bytes).unwrap_or(Value::Null),
        "timestamp" | "timestamptz" => row
            .try_get::<_, DateTime<Utc>>(idx)
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        "date" => row.try_get::<_, NaiveDate>(idx).map(Value::Date).unwrap_or(Value::Null),
        "time" => row.try_get::<_, NaiveTime>(idx).map(Value::Time).unwrap_or(Value::Null),
        "json" | "jsonb" => row
            .try_get::<_, serde_json::Value>(idx)
            .map(|v| Value::Json(v.to_string()))
            .unwrap_or(Value::Null),
        _ => row.try_get::<_, String>(idx).map(Value::Text).unwrap_or(Value::Null),
    }
}
