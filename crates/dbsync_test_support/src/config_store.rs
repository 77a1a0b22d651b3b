use std::sync::Mutex;

use dbsync_core::{Config, ConfigStore, ConnectionSpec, DbError, PairSpec, Settings};

/// In-memory [`ConfigStore`] used by supervisor and worker tests in place of
/// [`dbsync_core::FileConfigStore`], so those tests don't need a tempdir.
#[derive(Default)]
pub struct InMemoryConfigStore {
    config: Mutex<Config>,
}

impl InMemoryConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Config> {
        match self.config.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load(&self) -> Result<Config, DbError> {
        Ok(self.lock().clone())
    }

    fn add_connection(&self, spec: ConnectionSpec) -> Result<(), DbError> {
        self.lock().connections.insert(spec.name.clone(), spec);
        Ok(())
    }

    fn remove_connection(&self, name: &str) -> Result<(), DbError> {
        self.lock().connections.remove(name);
        Ok(())
    }

    fn add_pair(&self, spec: PairSpec) -> Result<(), DbError> {
        self.lock().pairs.insert(spec.name.clone(), spec);
        Ok(())
    }

    fn remove_pair(&self, name: &str) -> Result<(), DbError> {
        self.lock().pairs.remove(name);
        Ok(())
    }

    fn update_sync_pair_status(&self, name: &str, enabled: bool) -> Result<(), DbError> {
        let mut config = self.lock();
        let pair = config
            .pairs
            .get_mut(name)
            .ok_or_else(|| DbError::configuration_invalid(format!("unknown pair '{name}'")))?;
        pair.enabled = enabled;
        Ok(())
    }

    fn update_last_sync(&self, name: &str) -> Result<(), DbError> {
        let mut config = self.lock();
        let pair = config
            .pairs
            .get_mut(name)
            .ok_or_else(|| DbError::configuration_invalid(format!("unknown pair '{name}'")))?;
        pair.last_sync_at = Some(chrono::Utc::now());
        Ok(())
    }

    fn update_settings(&self, patch: Settings) -> Result<(), DbError> {
        self.lock().settings = patch;
        Ok(())
    }
}
