use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use dbsync_core::{DbError, DialectAdapter, PairSpec, TableDescriptor, TableSyncState, Value};

use crate::TickResult;

const DELETE_BATCH_SIZE: usize = 100;

/// Detects and replays INSERT/UPDATE/DELETE for every selected table using
/// only SELECT/INSERT/UPDATE/DELETE (§4.2). A table-level failure is
/// recorded and the tick continues with the next table.
pub async fn run_data_tick(
    source: &dyn DialectAdapter,
    target: &dyn DialectAdapter,
    pair: &PairSpec,
    states: &mut HashMap<String, TableSyncState>,
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
    let target_names: std::collections::HashSet<&str> =
        target_tables.iter().map(|t| t.name.as_str()).collect();

    for table in source_tables.iter().filter(|t| pair.selects_table(&t.name)) {
        if !target_names.contains(table.name.as_str()) {
            // Deferred to the next Schema Differ tick (§4.2 edge cases).
            result.errors.push(format!("{}: table missing on target", table.name));
            continue;
        }

        match process_table(source, target, table, states).await {
            Ok(mutated) => result.mutated |= mutated,
            Err(e) => {
                log::error!("data tick failed for table {}: {}", table.name, e);
                result.errors.push(format!("{}: {}", table.name, e));
            }
        }
    }

    result
}

async fn process_table(
    source: &dyn DialectAdapter,
    target: &dyn DialectAdapter,
    table: &TableDescriptor,
    states: &mut HashMap<String, TableSyncState>,
) -> Result<bool, DbError> {
    let columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let target_count = target.count_rows(&table.name).await?;

    if target_count == 0 {
        let rows = source.select_all(&table.name).await?;
        if rows.is_empty() {
            return Ok(false);
        }
        target.truncate_table(&table.name).await?;
        let affected = target.insert_rows(&table.name, &columns, &rows).await?;
        log::info!("Inserted {} new rows in table: {}", affected, table.name);
        states.insert(table.name.clone(), TableSyncState::new(Utc::now(), affected));
        return Ok(affected > 0);
    }

    match table.primary_key_column() {
        Some(pk) => reconcile_by_primary_key(source, target, table, pk, &columns, states).await,
        None => {
            log::warn!(
                "table {} has no primary key; falling back to row-count comparison",
                table.name
            );
            count_based_fallback(source, target, table, &columns, target_count, states).await
        }
    }
}

/// PK-reconciliation (§4.2, GLOSSARY): inserts are `S \ T`, deletes are
/// `T \ S`, updates are the witness-column window over the intersection.
async fn reconcile_by_primary_key(
    source: &dyn DialectAdapter,
    target: &dyn DialectAdapter,
    table: &TableDescriptor,
    pk: &str,
    columns: &[String],
    states: &mut HashMap<String, TableSyncState>,
) -> Result<bool, DbError> {
    let source_keys: BTreeSet<Value> = source.select_column(&table.name, pk).await?.into_iter().collect();
    let target_keys: BTreeSet<Value> = target.select_column(&table.name, pk).await?.into_iter().collect();

    let mut affected = 0u64;

    let inserts: Vec<Value> = source_keys.difference(&target_keys).cloned().collect();
    if !inserts.is_empty() {
        let rows = source.select_by_keys(&table.name, pk, &inserts).await?;
        let n = target.insert_rows(&table.name, columns, &rows).await?;
        log::info!("Inserted {} new rows in table: {}", n, table.name);
        affected += n;
    }

    if let Some(witness) = table.witness_column() {
        if let Some(state) = states.get(&table.name) {
            let changed = source
                .select_where_gt(&table.name, witness, &Value::DateTime(state.last_sync_time))
                .await?;
            if !changed.is_empty() {
                let n = target.upsert_rows(&table.name, columns, &changed, pk).await?;
                log::info!("Updated {} rows in table: {}", n, table.name);
                affected += n;
            }
        }
    }

    let deletes: Vec<Value> = target_keys.difference(&source_keys).cloned().collect();
    for batch in deletes.chunks(DELETE_BATCH_SIZE) {
        let n = target.delete_by_keys(&table.name, pk, batch).await?;
        log::info!("Deleted {} rows from table: {}", n, table.name);
        affected += n;
    }

    if affected > 0 {
        states.insert(table.name.clone(), TableSyncState::new(Utc::now(), affected));
    }
    Ok(affected > 0)
}

/// No-primary-key path (§4.2): compare row counts; if a primary key exists
/// and the delta is small, upsert-and-reconcile; otherwise truncate/reload.
async fn count_based_fallback(
    source: &dyn DialectAdapter,
    target: &dyn DialectAdapter,
    table: &TableDescriptor,
    columns: &[String],
    target_count: u64,
    states: &mut HashMap<String, TableSyncState>,
) -> Result<bool, DbError> {
    let source_count = source.count_rows(&table.name).await?;
    if source_count == target_count {
        return Ok(false);
    }

    let delta = source_count.abs_diff(target_count);
    if let Some(pk) = table.primary_key_column() {
        if source_count > 0 && (delta as f64) < 0.5 * source_count as f64 {
            let rows = source.select_all(&table.name).await?;
            let mut affected = target.upsert_rows(&table.name, columns, &rows, pk).await?;

            let source_keys: BTreeSet<Value> =
                source.select_column(&table.name, pk).await?.into_iter().collect();
            let target_keys: BTreeSet<Value> =
                target.select_column(&table.name, pk).await?.into_iter().collect();
            let deletes: Vec<Value> = target_keys.difference(&source_keys).cloned().collect();
            for batch in deletes.chunks(DELETE_BATCH_SIZE) {
                affected += target.delete_by_keys(&table.name, pk, batch).await?;
            }

            states.insert(table.name.clone(), TableSyncState::new(Utc::now(), affected));
            return Ok(affected > 0);
        }
    }

    target.truncate_table(&table.name).await?;
    let rows = source.select_all(&table.name).await?;
    let affected = target.insert_rows(&table.name, columns, &rows).await?;
    states.insert(table.name.clone(), TableSyncState::new(Utc::now(), affected));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_test_support::{fixtures, FakeAdapter};

    fn users_table() -> TableDescriptor {
        fixtures::table(
            "users",
            vec![
                fixtures::column("id", "int", true),
                fixtures::column("name", "varchar(50)", false),
            ],
        )
    }

    fn pair() -> PairSpec {
        fixtures::pair("p", "src", "tgt")
    }

    #[tokio::test]
    async fn initial_sync_inserts_all_rows_into_empty_target() {
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql)
            .with_tables(vec![users_table()])
            .with_rows(
                "users",
                vec![
                    fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("a")]),
                    fixtures::row(vec![fixtures::int_cell(2), fixtures::text_cell("b")]),
                ],
            );
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![users_table()]);

        let mut states = HashMap::new();
        let result = run_data_tick(&source, &target, &pair(), &mut states).await;

        assert!(result.success());
        assert!(result.mutated);
        assert_eq!(target.select_all("users").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn tick_with_no_changes_is_not_mutating() {
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql)
            .with_tables(vec![users_table()])
            .with_rows("users", vec![fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("a")])]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql)
            .with_tables(vec![users_table()])
            .with_rows("users", vec![fixtures::row(vec![fixtures::int_cell(1), fixtures::text_cell("a")])]);

        let mut states = HashMap::new();
        let result = run_data_tick(&source, &target, &pair(), &mut states).await;

        assert!(result.success());
        assert!(!result.mutated);
    }

    #[tokio::test]
    async fn missing_target_table_is_recorded_as_error_not_panic() {
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_tables(vec![users_table()]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql);

        let mut states = HashMap::new();
        let result = run_data_tick(&source, &target, &pair(), &mut states).await;

        assert!(!result.success());
        assert_eq!(result.errors.len(), 1);
    }
}
