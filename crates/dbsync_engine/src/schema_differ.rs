use dbsync_core::{ColumnDescriptor, DialectAdapter, PairSpec, TableDescriptor};

use crate::TickResult;

/// Compares source and target table lists and brings the target's schema
/// in line (§4.3). Each table is diffed independently; a failure on one
/// table is recorded and does not stop the others.
pub async fn run_schema_tick(
    source: &dyn DialectAdapter,
    target: &dyn DialectAdapter,
    pair: &PairSpec,
) -> TickResult {
    let mut result = TickResult::default();

    let source_tables = match source.get_tables().await {
        Ok(t) => t,
        Err(e) => {
            result.errors.push(format!("get_tables(source): {e}"));
            return result;
        }
    };
    let target_tables = match target.get_tables().await {
        Ok(t) => t,
        Err(e) => {
            result.errors.push(format!("get_tables(target): {e}"));
            return result;
        }
    };

    let target_by_name: std::collections::HashMap<&str, &TableDescriptor> =
        target_tables.iter().map(|t| (t.name.as_str(), t)).collect();

    for table in source_tables.iter().filter(|t| pair.selects_table(&t.name)) {
        match diff_table(target, table, target_by_name.get(table.name.as_str()).copied()).await {
            Ok(mutated) => result.mutated |= mutated,
            Err(e) => {
                log::error!("schema diff failed for table {}: {}", table.name, e);
                result.errors.push(format!("{}: {}", table.name, e));
            }
        }
    }

    result
}

async fn diff_table(
    target: &dyn DialectAdapter,
    source_table: &TableDescriptor,
    target_table: Option<&TableDescriptor>,
) -> Result<bool, dbsync_core::DbError> {
    match target_table {
        None => {
            target.create_table(&source_table.create_statement).await?;
            log::info!("Created table: {}", source_table.name);
            Ok(true)
        }
        Some(existing) => {
            if existing.columns == source_table.columns && existing.indexes == source_table.indexes {
                return Ok(false);
            }
            update_table_structure(target, source_table, existing).await?;
            Ok(true)
        }
    }
}

/// Walks source columns against target columns by name, building one
/// ADD/MODIFY/DROP COLUMN statement per difference (§4.3). The statement is
/// issued as-is; an incompatible change surfaces as a table error rather
/// than being special-cased per engine.
async fn update_table_structure(
    target: &dyn DialectAdapter,
    source_table: &TableDescriptor,
    target_table: &TableDescriptor,
) -> Result<(), dbsync_core::DbError> {
    let quoted_table = target.escape_identifier(&source_table.name);

    for column in &source_table.columns {
        match target_table.column(&column.name) {
            None => {
                let ddl = format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quoted_table,
                    column_definition(target, column)
                );
                target.alter_table(&ddl).await?;
                log::info!("Added column {} to table {}", column.name, source_table.name);
            }
            Some(existing) => {
                if existing != column {
                    let ddl = format!(
                        "ALTER TABLE {} MODIFY COLUMN {}",
                        quoted_table,
                        column_definition(target, column)
                    );
                    target.alter_table(&ddl).await?;
                    log::info!("Modified column {} on table {}", column.name, source_table.name);
                }
            }
        }
    }

    for column in &target_table.columns {
        if source_table.column(&column.name).is_none() {
            let ddl = format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quoted_table,
                target.escape_identifier(&column.name)
            );
            target.alter_table(&ddl).await?;
            log::info!("Dropped column {} from table {}", column.name, source_table.name);
        }
    }

    reconcile_indexes(target, source_table, target_table).await?;
    Ok(())
}

fn column_definition(target: &dyn DialectAdapter, column: &ColumnDescriptor) -> String {
    let mut def = format!("{} {}", target.escape_identifier(&column.name), column.type_name);
    if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default_expr {
        def.push_str(&format!(" DEFAULT {}", default));
    }
    if !column.extra.is_empty() {
        def.push(' ');
        def.push_str(&column.extra);
    }
    def
}

/// Groups source and target indexes by name. Non-PRIMARY names missing in
/// source are dropped on target; missing in target are created (§4.3).
/// Primary-key indexes are never touched here — they're part of the CREATE
/// TABLE / column definitions instead.
async fn reconcile_indexes(
    target: &dyn DialectAdapter,
    source_table: &TableDescriptor,
    target_table: &TableDescriptor,
) -> Result<(), dbsync_core::DbError> {
    let source_by_name: std::collections::HashMap<&str, _> =
        source_table.indexes.iter().map(|i| (i.name.as_str(), i)).collect();
    let target_by_name: std::collections::HashMap<&str, _> =
        target_table.indexes.iter().map(|i| (i.name.as_str(), i)).collect();

    for index in &target_table.indexes {
        if index.name.eq_ignore_ascii_case("primary") {
            continue;
        }
        if !source_by_name.contains_key(index.name.as_str()) {
            let ddl = format!(
                "DROP INDEX {} ON {}",
                target.escape_identifier(&index.name),
                target.escape_identifier(&source_table.name)
            );
            target.alter_table(&ddl).await?;
            log::info!("Dropped index {} on table {}", index.name, source_table.name);
        }
    }

    for index in &source_table.indexes {
        if index.name.eq_ignore_ascii_case("primary") {
            continue;
        }
        if !target_by_name.contains_key(index.name.as_str()) {
            let columns = index
                .columns
                .iter()
                .map(|c| target.escape_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let unique = if index.unique { "UNIQUE " } else { "" };
            let ddl = format!(
                "CREATE {unique}INDEX {} ON {} ({})",
                target.escape_identifier(&index.name),
                target.escape_identifier(&source_table.name),
                columns
            );
            target.alter_table(&ddl).await?;
            log::info!("Created index {} on table {}", index.name, source_table.name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_test_support::{fixtures, FakeAdapter};

    fn users_columns() -> Vec<ColumnDescriptor> {
        vec![
            fixtures::column("id", "int", true),
            fixtures::column("name", "varchar(50)", false),
        ]
    }

    fn pair() -> PairSpec {
        fixtures::pair("p", "src", "tgt")
    }

    #[tokio::test]
    async fn creates_table_missing_on_target() {
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql)
            .with_tables(vec![fixtures::table("users", users_columns())]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(result.mutated);
        assert!(target.get_tables().await.unwrap().is_empty());
        assert_eq!(target.stats().executed_statements.len(), 1);
    }

    #[tokio::test]
    async fn matching_schema_is_not_mutating() {
        let table = fixtures::table("users", users_columns());
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![table.clone()]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![table]);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(!result.mutated);
        assert!(target.stats().executed_statements.is_empty());
    }

    #[tokio::test]
    async fn added_column_triggers_alter_table() {
        let mut source_columns = users_columns();
        source_columns.push(fixtures::column("email", "varchar(100)", false));
        let source_table = fixtures::table("users", source_columns);
        let target_table = fixtures::table("users", users_columns());

        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![source_table]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![target_table]);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(result.mutated);
        let stats = target.stats();
        assert_eq!(stats.executed_statements.len(), 1);
        assert!(stats.executed_statements[0].contains("ADD COLUMN"));
    }

    #[tokio::test]
    async fn dropped_column_triggers_alter_table() {
        let source_table = fixtures::table("users", vec![fixtures::column("id", "int", true)]);
        let target_table = fixtures::table("users", users_columns());

        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![source_table]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![target_table]);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(result.mutated);
        let stats = target.stats();
        assert!(stats.executed_statements.iter().any(|s| s.contains("DROP COLUMN")));
    }

    #[tokio::test]
    async fn new_index_on_source_is_created_on_target() {
        let mut source_table = fixtures::table("users", users_columns());
        source_table.indexes.push(fixtures::index("idx_name", &["name"], false));
        let target_table = fixtures::table("users", users_columns());

        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![source_table]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![target_table]);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(result.mutated);
        let stats = target.stats();
        assert!(stats.executed_statements.iter().any(|s| s.contains("CREATE INDEX")));
    }

    #[tokio::test]
    async fn index_removed_from_source_is_dropped_on_target() {
        let source_table = fixtures::table("users", users_columns());
        let mut target_table = fixtures::table("users", users_columns());
        target_table.indexes.push(fixtures::index("idx_name", &["name"], false));

        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![source_table]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![target_table]);

        let result = run_schema_tick(&source, &target, &pair()).await;

        assert!(result.success());
        assert!(result.mutated);
        let stats = target.stats();
        assert!(stats.executed_statements.iter().any(|s| s.contains("DROP INDEX")));
    }
}
