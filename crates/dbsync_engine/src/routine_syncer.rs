use dbsync_core::{DialectAdapter, RoutineDescriptor, RoutineKind};

use crate::TickResult;

const KINDS: [RoutineKind; 3] = [RoutineKind::Procedure, RoutineKind::Function, RoutineKind::Trigger];

/// Syncs procedures, functions, and triggers (§4.4). Routines that exist
/// only on target are never dropped — a conservative, one-way policy.
pub async fn sync_all(source: &dyn DialectAdapter, target: &dyn DialectAdapter) -> TickResult {
    let mut result = TickResult::default();
    for kind in KINDS {
        result.merge(sync_kind(source, target, kind).await);
    }
    result
}

async fn sync_kind(source: &dyn DialectAdapter, target: &dyn DialectAdapter, kind: RoutineKind) -> TickResult {
    let mut result = TickResult::default();

    let source_routines = match source.get_procedures(kind).await {
        Ok(r) => r,
        Err(e) => {
            result.errors.push(format!("get_procedures({kind:?}, source): {e}"));
            return result;
        }
    };
    let target_routines = match target.get_procedures(kind).await {
        Ok(r) => r,
        Err(e) => {
            result.errors.push(format!("get_procedures({kind:?}, target): {e}"));
            return result;
        }
    };
    let target_by_name: std::collections::HashMap<&str, &RoutineDescriptor> =
        target_routines.iter().map(|r| (r.name.as_str(), r)).collect();

    for routine in &source_routines {
        match target_by_name.get(routine.name.as_str()) {
            None => match target.execute(&routine.create_statement, &[]).await {
                Ok(_) => {
                    log::info!("Created {} {}", kind.as_str().to_lowercase(), routine.name);
                    result.mutated = true;
                }
                Err(e) => result.errors.push(format!("{}: {}", routine.name, e)),
            },
            Some(existing) => {
                if existing.create_statement != routine.create_statement {
                    if let Err(e) = recreate(target, kind, routine).await {
                        result.errors.push(format!("{}: {}", routine.name, e));
                    } else {
                        log::info!("Recreated {} {}", kind.as_str().to_lowercase(), routine.name);
                        result.mutated = true;
                    }
                }
            }
        }
    }

    result
}

async fn recreate(
    target: &dyn DialectAdapter,
    kind: RoutineKind,
    routine: &RoutineDescriptor,
) -> Result<(), dbsync_core::DbError> {
    let drop_sql = format!(
        "DROP {} IF EXISTS {}",
        kind.as_str(),
        target.escape_identifier(&routine.name)
    );
    target.execute(&drop_sql, &[]).await?;
    target.execute(&routine.create_statement, &[]).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_test_support::{fixtures, FakeAdapter};

    #[tokio::test]
    async fn procedure_missing_on_target_is_created() {
        let proc = fixtures::routine("add_user", RoutineKind::Procedure, "CREATE PROCEDURE add_user() BEGIN END");
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![proc]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql);

        let result = sync_all(&source, &target).await;

        assert!(result.success());
        assert!(result.mutated);
        assert_eq!(target.stats().executed_statements.len(), 1);
    }

    #[tokio::test]
    async fn identical_routine_is_not_mutating() {
        let proc = fixtures::routine("add_user", RoutineKind::Procedure, "CREATE PROCEDURE add_user() BEGIN END");
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![proc.clone()]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![proc]);

        let result = sync_all(&source, &target).await;

        assert!(result.success());
        assert!(!result.mutated);
        assert!(target.stats().executed_statements.is_empty());
    }

    #[tokio::test]
    async fn changed_create_statement_is_dropped_and_recreated() {
        let source_proc = fixtures::routine(
            "add_user",
            RoutineKind::Procedure,
            "CREATE PROCEDURE add_user() BEGIN INSERT INTO users VALUES (1); END",
        );
        let target_proc = fixtures::routine("add_user", RoutineKind::Procedure, "CREATE PROCEDURE add_user() BEGIN END");

        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![source_proc]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![target_proc]);

        let result = sync_all(&source, &target).await;

        assert!(result.success());
        assert!(result.mutated);
        let stats = target.stats();
        assert_eq!(stats.executed_statements.len(), 2);
        assert!(stats.executed_statements[0].starts_with("DROP PROCEDURE"));
    }

    #[tokio::test]
    async fn routine_only_on_target_is_never_dropped() {
        let target_proc = fixtures::routine("legacy_cleanup", RoutineKind::Procedure, "CREATE PROCEDURE legacy_cleanup() BEGIN END");
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_procedures(vec![target_proc]);

        let result = sync_all(&source, &target).await;

        assert!(result.success());
        assert!(!result.mutated);
        assert!(target.stats().executed_statements.is_empty());
    }

    #[tokio::test]
    async fn triggers_are_synced_through_their_own_accessor() {
        let trigger = fixtures::routine(
            "users_audit",
            RoutineKind::Trigger,
            "CREATE TRIGGER users_audit AFTER INSERT ON users FOR EACH ROW BEGIN END",
        );
        let source = FakeAdapter::new(dbsync_core::EngineKind::Mysql).with_triggers(vec![trigger]);
        let target = FakeAdapter::new(dbsync_core::EngineKind::Mysql);

        let result = sync_all(&source, &target).await;

        assert!(result.success());
        assert!(result.mutated);
        assert_eq!(target.stats().executed_statements.len(), 1);
    }
}
