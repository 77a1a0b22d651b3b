use std::collections::HashMap;
use std::sync::Arc;

use dbsync_core::{ConfigStore, ConnectionSpec, DbError, DialectAdapter, PairSpec};
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::pair_worker::{PairWorker, WorkerState};

/// Status snapshot for one running or stopped pair (§4.6: `perPair:[{name,running}]`).
#[derive(Debug, Clone)]
pub struct PairStatus {
    pub name: String,
    pub running: bool,
    pub state: WorkerState,
}

/// Status snapshot for the whole daemon (§4.6: `{isRunning, activeServices, perPair}`).
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub is_running: bool,
    pub active_services: usize,
    pub per_pair: Vec<PairStatus>,
}

/// Builds the right [`DialectAdapter`] for a connection's engine. Supplied
/// by the binary crate so this crate stays free of any dependency on the
/// concrete driver crates.
pub type AdapterFactory = Arc<dyn Fn(&ConnectionSpec) -> Arc<dyn DialectAdapter> + Send + Sync>;

/// Owns one [`PairWorker`] per enabled pair and starts/stops them together
/// (§4.6). Reads its pair and connection list from the configuration
/// collaborator at `start_all` time; pairs added afterward need a fresh
/// `start_all` (or a future reload, tracked as an open question).
pub struct DaemonSupervisor {
    config: Arc<dyn ConfigStore>,
    make_adapter: AdapterFactory,
    workers: RwLock<HashMap<String, Arc<PairWorker>>>,
}

impl DaemonSupervisor {
    pub fn new(config: Arc<dyn ConfigStore>, make_adapter: AdapterFactory) -> Self {
        Self {
            config,
            make_adapter,
            workers: RwLock::new(HashMap::new()),
        }
    }

    /// Starts a worker for every enabled pair. A pair whose worker fails to
    /// start is logged and skipped; the rest continue starting (§4.6).
    pub async fn start_all(&self) -> Result<(), DbError> {
        let config = self.config.load()?;
        let settings = config.settings;

        let mut joins = JoinSet::new();
        for pair in config.pairs.into_values().filter(|p| p.enabled) {
            let source_conn = config
                .connections
                .get(&pair.source_connection)
                .cloned()
                .ok_or_else(|| {
                    DbError::configuration_invalid(format!(
                        "pair '{}': unknown source connection '{}'",
                        pair.name, pair.source_connection
                    ))
                })?;
            let target_conn = config
                .connections
                .get(&pair.target_connection)
                .cloned()
                .ok_or_else(|| {
                    DbError::configuration_invalid(format!(
                        "pair '{}': unknown target connection '{}'",
                        pair.name, pair.target_connection
                    ))
                })?;

            let source = (self.make_adapter)(&source_conn);
            let target = (self.make_adapter)(&target_conn);
            let worker = Arc::new(PairWorker::new(
                pair.clone(),
                source,
                target,
                Arc::clone(&self.config),
                settings.clone(),
            ));

            {
                let mut workers = self.workers.write().await;
                workers.insert(pair.name.clone(), Arc::clone(&worker));
            }

            joins.spawn(async move {
                let name = worker.name().to_string();
                match worker.start().await {
                    Ok(()) => log::info!("pair {name} started"),
                    Err(e) => log::error!("pair {name} failed to start: {e}"),
                }
            });
        }

        while joins.join_next().await.is_some() {}
        Ok(())
    }

    /// Stops every worker in parallel and waits for them all (§4.6).
    pub async fn stop_all(&self) {
        let workers: Vec<Arc<PairWorker>> = self.workers.read().await.values().cloned().collect();
        let mut joins = JoinSet::new();
        for worker in workers {
            joins.spawn(async move {
                worker.stop().await;
            });
        }
        while joins.join_next().await.is_some() {}
    }

    pub async fn status(&self) -> DaemonStatus {
        let workers = self.workers.read().await;
        let mut per_pair = Vec::with_capacity(workers.len());
        for worker in workers.values() {
            let state = worker.state().await;
            per_pair.push(PairStatus {
                name: worker.name().to_string(),
                running: matches!(state, WorkerState::Running),
                state,
            });
        }
        let active_services = per_pair.iter().filter(|p| p.running).count();
        DaemonStatus {
            is_running: active_services > 0,
            active_services,
            per_pair,
        }
    }

    /// Starts a single additional pair without restarting the rest, e.g.
    /// after an operator enables it via the CLI (§4.6 control surface).
    pub async fn start_pair(&self, pair: PairSpec) -> Result<(), DbError> {
        let config = self.config.load()?;
        let source_conn = config
            .connections
            .get(&pair.source_connection)
            .cloned()
            .ok_or_else(|| {
                DbError::configuration_invalid(format!("unknown source connection '{}'", pair.source_connection))
            })?;
        let target_conn = config
            .connections
            .get(&pair.target_connection)
            .cloned()
            .ok_or_else(|| {
                DbError::configuration_invalid(format!("unknown target connection '{}'", pair.target_connection))
            })?;

        let source = (self.make_adapter)(&source_conn);
        let target = (self.make_adapter)(&target_conn);
        let worker = Arc::new(PairWorker::new(
            pair.clone(),
            source,
            target,
            Arc::clone(&self.config),
            config.settings,
        ));

        self.workers.write().await.insert(pair.name.clone(), Arc::clone(&worker));
        worker.start().await
    }

    pub async fn stop_pair(&self, name: &str) {
        let worker = self.workers.read().await.get(name).cloned();
        if let Some(worker) = worker {
            worker.stop().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbsync_core::Config;
    use dbsync_test_support::{fixtures, FakeAdapter, InMemoryConfigStore};

    fn config_with(pairs: Vec<PairSpec>) -> Config {
        let mut config = Config::default();
        config.connections.insert("src".to_string(), fixtures::connection("src", dbsync_core::EngineKind::Mysql));
        config.connections.insert("tgt".to_string(), fixtures::connection("tgt", dbsync_core::EngineKind::Postgresql));
        for pair in pairs {
            config.pairs.insert(pair.name.clone(), pair);
        }
        config
    }

    fn fake_factory() -> AdapterFactory {
        Arc::new(|spec: &ConnectionSpec| -> Arc<dyn DialectAdapter> { Arc::new(FakeAdapter::new(spec.engine)) })
    }

    #[tokio::test]
    async fn start_all_only_starts_enabled_pairs() {
        let mut enabled = fixtures::pair("enabled", "src", "tgt");
        enabled.sync_schema = false;
        enabled.sync_data = false;
        enabled.sync_procedures = false;
        let mut disabled = fixtures::pair("disabled", "src", "tgt");
        disabled.enabled = false;

        let store = Arc::new(InMemoryConfigStore::new(config_with(vec![enabled, disabled])));
        let supervisor = DaemonSupervisor::new(store, fake_factory());

        supervisor.start_all().await.unwrap();
        let status = supervisor.status().await;

        assert_eq!(status.per_pair.len(), 1);
        assert_eq!(status.per_pair[0].name, "enabled");
        assert!(status.is_running);
        assert_eq!(status.active_services, 1);
    }

    #[tokio::test]
    async fn status_reflects_pair_that_failed_to_start() {
        let mut pair = fixtures::pair("p", "src", "tgt");
        pair.sync_schema = false;
        pair.sync_data = false;
        pair.sync_procedures = false;

        let store = Arc::new(InMemoryConfigStore::new(config_with(vec![pair])));
        let failing_factory: AdapterFactory = Arc::new(|spec: &ConnectionSpec| -> Arc<dyn DialectAdapter> {
            let adapter = FakeAdapter::new(spec.engine);
            if spec.name == "src" {
                Arc::new(adapter.with_connect_error("down"))
            } else {
                Arc::new(adapter)
            }
        });
        let supervisor = DaemonSupervisor::new(store, failing_factory);

        supervisor.start_all().await.unwrap();
        let status = supervisor.status().await;

        assert_eq!(status.per_pair.len(), 1);
        assert!(!status.per_pair[0].running);
        assert!(!status.is_running);
        assert_eq!(status.active_services, 0);
    }

    #[tokio::test]
    async fn stop_all_stops_every_running_worker() {
        let mut pair = fixtures::pair("p", "src", "tgt");
        pair.sync_schema = false;
        pair.sync_data = false;
        pair.sync_procedures = false;

        let store = Arc::new(InMemoryConfigStore::new(config_with(vec![pair])));
        let supervisor = DaemonSupervisor::new(store, fake_factory());

        supervisor.start_all().await.unwrap();
        supervisor.stop_all().await;
        let status = supervisor.status().await;

        assert!(!status.is_running);
        assert_eq!(status.per_pair[0].state, WorkerState::Stopped);
    }
}
