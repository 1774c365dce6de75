//! Settings manager

use std::path::PathBuf;
use tokio::sync::RwLock;

use habitimer_core::{models::Config, storage::ConfigStorage, Result as CoreResult};

#[derive(Debug, thiserror::Error)]
pub enum ConfigManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] habitimer_core::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigManagerError>;

pub struct ConfigManager {
    storage: ConfigStorage,
    config: RwLock<Config>,
}

impl ConfigManager {
    pub fn new(config_dir: PathBuf) -> CoreResult<Self> {
        let storage = ConfigStorage::new(config_dir);
        let config = storage.load()?;

        Ok(Self {
            storage,
            config: RwLock::new(config),
        })
    }

    pub async fn get(&self) -> Config {
        self.config.read().await.clone()
    }

    pub async fn update(&self, config: Config) -> Result<Config> {
        config
            .validate()
            .map_err(|e| ConfigManagerError::Invalid(e.to_string()))?;

        self.storage.save(&config)?;

        {
            let mut current = self.config.write().await;
            *current = config.clone();
        }

        tracing::info!("Settings updated");
        Ok(config)
    }

    pub async fn set_log_level(&self, log_level: String) -> Result<Config> {
        let mut config = self.get().await;
        config.log_level = log_level;
        self.update(config).await
    }

    pub async fn set_daily_goal(&self, minutes: u64) -> Result<Config> {
        let mut config = self.get().await;
        config.daily_goal_minutes = minutes;
        self.update(config).await
    }

    pub async fn reset_to_default(&self) -> Result<Config> {
        self.update(Config::default()).await
    }
}
