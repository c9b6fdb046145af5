use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::SystemTime;

#[derive(Default)]
struct ConfigCacheState {
    config: Option<Config>,
    modified: Option<SystemTime>,
}

/// Caches the parsed config and reloads it when the file changes on disk.
pub(crate) struct ConfigOrchestrator {
    path: PathBuf,
    state: Mutex<ConfigCacheState>,
}

static CONFIG_ORCHESTRATOR: LazyLock<ConfigOrchestrator> =
    LazyLock::new(|| ConfigOrchestrator::new(Config::get_config_path()));

impl ConfigOrchestrator {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            state: Mutex::new(ConfigCacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConfigCacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn refresh(&self, state: &mut ConfigCacheState) -> Result<Config, ConfigError> {
        let disk_modified = Self::modified_time(&self.path);
        match &state.config {
            Some(config) if state.modified == disk_modified => Ok(config.clone()),
            _ => {
                let config = Config::load_from_path(&self.path)?;
                state.modified = disk_modified;
                state.config = Some(config.clone());
                Ok(config)
            }
        }
    }

    pub(crate) fn load_with_cache(&self) -> Result<Config, ConfigError> {
        let mut state = self.lock();
        self.refresh(&mut state)
    }

    pub(crate) fn persist(&self, config: Config) -> Result<(), ConfigError> {
        config.save_to_path(&self.path)?;
        let mut state = self.lock();
        state.modified = Self::modified_time(&self.path);
        state.config = Some(config);
        Ok(())
    }

    pub(crate) fn mutate<F, T>(&self, mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        let mut working = {
            let mut state = self.lock();
            self.refresh(&mut state)?
        };
        let result = mutator(&mut working)?;
        self.persist(working)?;
        Ok(result)
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok()?.modified().ok()
    }
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        CONFIG_ORCHESTRATOR.load_with_cache()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        CONFIG_ORCHESTRATOR.persist(self.clone())
    }

    /// Load, apply `mutator`, and save only if it succeeded.
    pub fn mutate<F, T>(mutator: F) -> Result<T, Box<dyn std::error::Error>>
    where
        F: FnOnce(&mut Config) -> Result<T, Box<dyn std::error::Error>>,
    {
        CONFIG_ORCHESTRATOR.mutate(mutator)
    }
}
