//! Startup wiring shared by every view

use std::path::PathBuf;
use std::sync::Arc;

use habitimer_core::storage::{init_data_dir, FilePreferences, Preferences};

use crate::config::ConfigManager;
use crate::event_bus::EventBus;
use crate::history::{RecordManager, RecordManagerError};
use crate::timer::{TimerSession, TimerStore, TimerStoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] habitimer_core::Error),

    #[error("History error: {0}")]
    History(#[from] RecordManagerError),

    #[error("Timer store error: {0}")]
    TimerStore(#[from] TimerStoreError),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Everything a view needs, built once at startup and passed by reference
pub struct App {
    pub data_dir: PathBuf,
    pub event_bus: Arc<EventBus>,
    pub timer_store: Arc<TimerStore>,
    pub records: Arc<RecordManager>,
    pub session: TimerSession,
    pub config: ConfigManager,
}

impl App {
    /// Open the app on `data_dir`, or the platform data directory
    pub async fn open(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = init_data_dir(data_dir)?;
        let preferences = Arc::new(FilePreferences::new(data_dir.clone()));
        Self::open_with_preferences(data_dir, preferences).await
    }

    pub async fn open_with_preferences(
        data_dir: PathBuf,
        preferences: Arc<dyn Preferences>,
    ) -> Result<Self> {
        let event_bus = Arc::new(EventBus::new());
        let timer_store = Arc::new(TimerStore::new(preferences));
        let records = Arc::new(RecordManager::load(data_dir.clone(), event_bus.clone()).await?);
        let config = ConfigManager::new(data_dir.clone())?;

        match timer_store.restore().await {
            Ok(_) => {}
            // Left in storage: status reports it, cancel clears it
            Err(TimerStoreError::MalformedStartTime { value, .. }) => {
                tracing::warn!("Stored start time '{}' is unreadable", value);
            }
            Err(e) => return Err(e.into()),
        }

        let session = TimerSession::new(timer_store.clone(), records.clone());

        tracing::info!("App opened on {}", data_dir.display());
        Ok(Self {
            data_dir,
            event_bus,
            timer_store,
            records,
            session,
            config,
        })
    }
}
