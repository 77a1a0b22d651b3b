use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dbsync_core::{ConfigStore, ConnectionSpec, EngineKind, PairSpec};

#[derive(Parser)]
#[command(name = "dbsyncd", about = "Continuous schema/data/routine replication daemon")]
pub struct Cli {
    /// Path to the config store. Defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground, syncing every enabled pair.
    Run,
    /// Register a connection.
    AddConnection {
        name: String,
        #[arg(value_enum)]
        engine: CliEngine,
        host: String,
        port: u16,
        user: String,
        #[arg(long, default_value = "")]
        password: String,
        database: String,
    },
    /// Remove a connection (rejected if an enabled pair still uses it).
    RemoveConnection { name: String },
    /// List registered connections.
    ListConnections,
    /// Register a replication pair.
    AddPair {
        name: String,
        source: String,
        target: String,
        #[arg(long, default_value_t = true)]
        sync_schema: bool,
        #[arg(long, default_value_t = true)]
        sync_data: bool,
        #[arg(long, default_value_t = false)]
        sync_procedures: bool,
    },
    /// Remove a pair.
    RemovePair { name: String },
    /// Enable or disable a pair without removing it.
    SetPairEnabled { name: String, enabled: bool },
    /// List registered pairs and their last-sync timestamps.
    ListPairs,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum CliEngine {
    Mysql,
    Postgresql,
}

impl From<CliEngine> for EngineKind {
    fn from(value: CliEngine) -> Self {
        match value {
            CliEngine::Mysql => EngineKind::Mysql,
            CliEngine::Postgresql => EngineKind::Postgresql,
        }
    }
}

/// Handles every subcommand that only touches the config store, i.e.
/// everything except `Run`. Kept separate from `main` so the daemon's
/// async runtime doesn't have to spin up for a one-shot config edit.
pub fn handle_config_command(store: &dyn ConfigStore, command: Command) -> ExitCode {
    let result = match command {
        Command::Run => unreachable!("Run is handled by the async daemon path"),
        Command::AddConnection {
            name,
            engine,
            host,
            port,
            user,
            password,
            database,
        } => store.add_connection(ConnectionSpec {
            name,
            engine: engine.into(),
            host,
            port,
            user,
            password,
            database,
        }),
        Command::RemoveConnection { name } => store.remove_connection(&name),
        Command::ListConnections => {
            return print_connections(store);
        }
        Command::AddPair {
            name,
            source,
            target,
            sync_schema,
            sync_data,
            sync_procedures,
        } => store.add_pair(PairSpec {
            name,
            source_connection: source,
            target_connection: target,
            sync_schema,
            sync_data,
            sync_procedures,
            include_tables: Default::default(),
            exclude_tables: Default::default(),
            enabled: true,
            last_sync_at: None,
        }),
        Command::RemovePair { name } => store.remove_pair(&name),
        Command::SetPairEnabled { name, enabled } => store.update_sync_pair_status(&name, enabled),
        Command::ListPairs => {
            return print_pairs(store);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_connections(store: &dyn ConfigStore) -> ExitCode {
    match store.list_connections() {
        Ok(connections) => {
            for conn in connections {
                println!(
                    "{}\t{}\t{}:{}/{}",
                    conn.name,
                    conn.engine.display_name(),
                    conn.host,
                    conn.port,
                    conn.database
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn print_pairs(store: &dyn ConfigStore) -> ExitCode {
    match store.list_pairs() {
        Ok(pairs) => {
            for pair in pairs {
                let last_sync = pair
                    .last_sync_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}\t{} -> {}\tenabled={}\tlast_sync={}",
                    pair.name, pair.source_connection, pair.target_connection, pair.enabled, last_sync
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
