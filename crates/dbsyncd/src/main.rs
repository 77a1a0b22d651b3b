mod cli;
mod signals;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dbsync_core::{ConnectionSpec, DialectAdapter, EngineKind, FileConfigStore};
use dbsync_driver_mysql::MysqlAdapter;
use dbsync_driver_postgres::PostgresAdapter;
use dbsync_engine::DaemonSupervisor;

use cli::{Cli, Command};

fn make_adapter(spec: &ConnectionSpec) -> Arc<dyn DialectAdapter> {
    match spec.engine {
        EngineKind::Postgresql => Arc::new(PostgresAdapter::new(spec.clone())),
        EngineKind::Mysql => Arc::new(MysqlAdapter::new(spec.clone())),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .map(Ok)
        .unwrap_or_else(FileConfigStore::default_path);
    let config_path = match config_path {
        Ok(p) => p,
        Err(e) => {
            log::error!("could not resolve config path: {e}");
            return ExitCode::FAILURE;
        }
    };
    let store = Arc::new(FileConfigStore::new(config_path));

    match cli.command {
        Command::Run => run_daemon(store).await,
        other => cli::handle_config_command(store.as_ref(), other),
    }
}

async fn run_daemon(store: Arc<FileConfigStore>) -> ExitCode {
    let supervisor = Arc::new(DaemonSupervisor::new(store, Arc::new(make_adapter)));

    log::info!("starting dbsyncd");
    if let Err(e) = supervisor.start_all().await {
        log::error!("failed to start pairs: {e}");
        return ExitCode::FAILURE;
    }

    let shutdown = signals::install();
    shutdown.wait().await;

    log::info!("shutdown requested, stopping all pairs");
    supervisor.stop_all().await;
    log::info!("dbsyncd stopped");
    ExitCode::SUCCESS
}
