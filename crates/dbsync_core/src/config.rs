use crate::{ConnectionSpec, DbError, PairSpec, Settings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The persisted shape of a configuration store (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connections: HashMap<String, ConnectionSpec>,
    #[serde(default)]
    pub pairs: HashMap<String, PairSpec>,
    #[serde(default)]
    pub settings: Settings,
}

/// The configuration collaborator's operations (§6). The daemon and its
/// internals are written against this trait; [`FileConfigStore`] is the
/// reference implementation the process contract describes, not the only
/// possible one.
pub trait ConfigStore: Send + Sync {
    fn load(&self) -> Result<Config, DbError>;

    fn list_connections(&self) -> Result<Vec<ConnectionSpec>, DbError> {
        Ok(self.load()?.connections.into_values().collect())
    }

    fn get_connection(&self, name: &str) -> Result<Option<ConnectionSpec>, DbError> {
        Ok(self.load()?.connections.remove(name))
    }

    fn add_connection(&self, spec: ConnectionSpec) -> Result<(), DbError>;

    /// Rejects removal when any enabled pair still references `name` (§3
    /// invariant).
    fn remove_connection(&self, name: &str) -> Result<(), DbError>;

    fn list_pairs(&self) -> Result<Vec<PairSpec>, DbError> {
        Ok(self.load()?.pairs.into_values().collect())
    }

    fn get_pair(&self, name: &str) -> Result<Option<PairSpec>, DbError> {
        Ok(self.load()?.pairs.remove(name))
    }

    fn add_pair(&self, spec: PairSpec) -> Result<(), DbError>;

    fn remove_pair(&self, name: &str) -> Result<(), DbError>;

    fn update_sync_pair_status(&self, name: &str, enabled: bool) -> Result<(), DbError>;

    fn update_last_sync(&self, name: &str) -> Result<(), DbError>;

    fn get_settings(&self) -> Result<Settings, DbError> {
        Ok(self.load()?.settings)
    }

    fn update_settings(&self, patch: Settings) -> Result<(), DbError>;
}

/// File-backed configuration store. Persists atomically: writes to a
/// sibling `.tmp` file and renames over the target, so a crash mid-write
/// never leaves a half-written config on disk. A store that fails to parse
/// is surfaced as `DbError::ConfigurationInvalid` — per §6, the daemon
/// refuses to start on a corrupted store rather than silently resetting it.
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/dbsync/config.toml` (or platform equivalent).
    pub fn default_path() -> Result<PathBuf, DbError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DbError::IoError(std::io::Error::other("no config directory")))?;
        Ok(config_dir.join("dbsync").join("config.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Config, DbError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&self.path)?;
        toml::from_str(&content)
            .map_err(|e| DbError::configuration_invalid(format!("corrupted config store: {e}")))
    }

    fn write(&self, config: &Config) -> Result<(), DbError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string_pretty(config)
            .map_err(|e| DbError::configuration_invalid(e.to_string()))?;
        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, serialized)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<Config, DbError> {
        self.read()
    }

    fn add_connection(&self, spec: ConnectionSpec) -> Result<(), DbError> {
        let mut config = self.read()?;
        if config.connections.contains_key(&spec.name) {
            return Err(DbError::configuration_invalid(format!(
                "connection '{}' already exists",
                spec.name
            )));
        }
        config.connections.insert(spec.name.clone(), spec);
        self.write(&config)
    }

    fn remove_connection(&self, name: &str) -> Result<(), DbError> {
        let mut config = self.read()?;
        let in_use = config.pairs.values().any(|p| {
            p.enabled && (p.source_connection == name || p.target_connection == name)
        });
        if in_use {
            return Err(DbError::configuration_invalid(format!(
                "connection '{name}' is used by an enabled pair"
            )));
        }
        config.connections.remove(name);
        self.write(&config)
    }

    fn add_pair(&self, spec: PairSpec) -> Result<(), DbError> {
        let mut config = self.read()?;
        if config.pairs.contains_key(&spec.name) {
            return Err(DbError::configuration_invalid(format!(
                "pair '{}' already exists",
                spec.name
            )));
        }
        if !config.connections.contains_key(&spec.source_connection) {
            return Err(DbError::configuration_invalid(format!(
                "unknown source connection '{}'",
                spec.source_connection
            )));
        }
        if !config.connections.contains_key(&spec.target_connection) {
            return Err(DbError::configuration_invalid(format!(
                "unknown target connection '{}'",
                spec.target_connection
            )));
        }
        if spec.source_connection == spec.target_connection {
            return Err(DbError::configuration_invalid(
                "pair source and target must resolve to distinct connections",
            ));
        }
        config.pairs.insert(spec.name.clone(), spec);
        self.write(&config)
    }

    fn remove_pair(&self, name: &str) -> Result<(), DbError> {
        let mut config = self.read()?;
        config.pairs.remove(name);
        self.write(&config)
    }

    fn update_sync_pair_status(&self, name: &str, enabled: bool) -> Result<(), DbError> {
        let mut config = self.read()?;
        let pair = config.pairs.get_mut(name).ok_or_else(|| {
            DbError::configuration_invalid(format!("unknown pair '{name}'"))
        })?;
        pair.enabled = enabled;
        self.write(&config)
    }

    fn update_last_sync(&self, name: &str) -> Result<(), DbError> {
        let mut config = self.read()?;
        let pair = config.pairs.get_mut(name).ok_or_else(|| {
            DbError::configuration_invalid(format!("unknown pair '{name}'"))
        })?;
        pair.last_sync_at = Some(Utc::now());
        self.write(&config)
    }

    fn update_settings(&self, patch: Settings) -> Result<(), DbError> {
        let mut config = self.read()?;
        config.settings = patch;
        self.write(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineKind;
    use tempfile::tempdir;

    fn conn(name: &str) -> ConnectionSpec {
        ConnectionSpec {
            name: name.to_string(),
            engine: EngineKind::Postgresql,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: "".into(),
            database: "app".into(),
        }
    }

    fn pair(name: &str, source: &str, target: &str) -> PairSpec {
        PairSpec {
            name: name.to_string(),
            source_connection: source.to_string(),
            target_connection: target.to_string(),
            sync_schema: true,
            sync_data: true,
            sync_procedures: false,
            include_tables: Default::default(),
            exclude_tables: Default::default(),
            enabled: true,
            last_sync_at: None,
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.toml"));
        store.add_connection(conn("src")).unwrap();
        store.add_connection(conn("tgt")).unwrap();
        store.add_pair(pair("p1", "src", "tgt")).unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.pairs.len(), 1);
    }

    #[test]
    fn rejects_duplicate_connection() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.toml"));
        store.add_connection(conn("src")).unwrap();
        assert!(store.add_connection(conn("src")).is_err());
    }

    #[test]
    fn rejects_removal_of_connection_used_by_enabled_pair() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.toml"));
        store.add_connection(conn("src")).unwrap();
        store.add_connection(conn("tgt")).unwrap();
        store.add_pair(pair("p1", "src", "tgt")).unwrap();

        assert!(store.remove_connection("src").is_err());
    }

    #[test]
    fn allows_removal_once_pair_disabled() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.toml"));
        store.add_connection(conn("src")).unwrap();
        store.add_connection(conn("tgt")).unwrap();
        store.add_pair(pair("p1", "src", "tgt")).unwrap();
        store.update_sync_pair_status("p1", false).unwrap();

        assert!(store.remove_connection("src").is_ok());
    }

    #[test]
    fn update_last_sync_stamps_current_time() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::new(dir.path().join("config.toml"));
        store.add_connection(conn("src")).unwrap();
        store.add_connection(conn("tgt")).unwrap();
        store.add_pair(pair("p1", "src", "tgt")).unwrap();
        store.update_last_sync("p1").unwrap();

        let config = store.load().unwrap();
        assert!(config.pairs["p1"].last_sync_at.is_some());
    }

    #[test]
    fn corrupted_store_surfaces_as_load_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "not valid toml {{{").unwrap();
        let store = FileConfigStore::new(path);

        assert!(matches!(
            store.load(),
            Err(DbError::ConfigurationInvalid(_))
        ));
    }
}
