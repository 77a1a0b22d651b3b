use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Database engines a [`ConnectionSpec`] can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Mysql,
    Postgresql,
}

impl EngineKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            EngineKind::Mysql => "MySQL",
            EngineKind::Postgresql => "PostgreSQL",
        }
    }
}

/// Immutable-per-run connection parameters for one side of a pair (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub name: String,
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// A replication stream: one source connection, one target connection,
/// and the toggles that scope what gets synced (§3, GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairSpec {
    pub name: String,
    pub source_connection: String,
    pub target_connection: String,
    pub sync_schema: bool,
    pub sync_data: bool,
    pub sync_procedures: bool,
    /// Whitelist; table-name matching is exact and case-sensitive. Empty
    /// means "no whitelist" (all tables are candidates before excludes).
    #[serde(default)]
    pub include_tables: HashSet<String>,
    /// Blacklist, applied after `include_tables`.
    #[serde(default)]
    pub exclude_tables: HashSet<String>,
    pub enabled: bool,
    /// Informational; updated by the worker after a mutating tick.
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl PairSpec {
    /// Table selection per §4.2: filter by include (if non-empty), then by
    /// exclude.
    pub fn selects_table(&self, table_name: &str) -> bool {
        if !self.include_tables.is_empty() && !self.include_tables.contains(table_name) {
            return false;
        }
        !self.exclude_tables.contains(table_name)
    }
}

/// Daemon-wide tuning knobs (§3). Both intervals must be positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    #[serde(with = "humantime_duration")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_duration")]
    pub schema_check_interval: Duration,
    pub log_level: LogLevel,
    pub max_retries: u32,
    #[serde(with = "humantime_duration")]
    pub retry_delay: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            schema_check_interval: Duration::from_secs(300),
            log_level: LogLevel::Info,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

/// In-memory, per-table, per-pair bookkeeping that drives timestamp-window
/// queries (§3). Reset on worker restart; never persisted.
#[derive(Debug, Clone, Copy)]
pub struct TableSyncState {
    pub last_sync_time: DateTime<Utc>,
    /// Rows affected by the tick that produced this state. Written, never
    /// read by the engine itself (§9 open question) — kept for operators
    /// inspecting worker status.
    pub row_count: u64,
}

impl TableSyncState {
    pub fn new(now: DateTime<Utc>, row_count: u64) -> Self {
        Self {
            last_sync_time: now,
            row_count,
        }
    }
}

/// (De)serializes a [`Duration`] as a whole number of milliseconds, so
/// settings read naturally from config files without a duration DSL.
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
