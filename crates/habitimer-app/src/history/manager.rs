use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::event_bus::EventBus;
use crate::events::RecordEvent;
use habitimer_core::{models::TimerRecord, storage::RecordStorage};

#[derive(Debug, thiserror::Error)]
pub enum RecordManagerError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] habitimer_core::Error),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Task join error: {0}")]
    JoinError(String),
}

pub type Result<T> = std::result::Result<T, RecordManagerError>;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordStats {
    pub total_records: usize,
    pub total_duration_seconds: u64,
    pub avg_duration_seconds: u64,
}

/// Owns the timer history: the CSV file, an in-memory copy, and the
/// notifications sent after each change.
pub struct RecordManager {
    data_dir: PathBuf,
    cache: RwLock<Vec<TimerRecord>>,
    last_modified: RwLock<Option<DateTime<Utc>>>,
    event_bus: Arc<EventBus>,
}

impl RecordManager {
    pub async fn load(data_dir: PathBuf, event_bus: Arc<EventBus>) -> Result<Self> {
        let records = Self::blocking(data_dir.clone(), |storage| storage.load()).await?;
        tracing::info!("Loaded {} history records", records.len());

        Ok(Self {
            data_dir,
            cache: RwLock::new(records),
            last_modified: RwLock::new(None),
            event_bus,
        })
    }

    async fn blocking<T, F>(data_dir: PathBuf, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(RecordStorage) -> habitimer_core::Result<T> + Send + 'static,
    {
        let result = tokio::task::spawn_blocking(move || op(RecordStorage::new(data_dir)))
            .await
            .map_err(|e| RecordManagerError::JoinError(e.to_string()))??;
        Ok(result)
    }

    /// Records ordered by start time, newest first
    pub async fn list(&self) -> Vec<TimerRecord> {
        let mut records = self.cache.read().await.clone();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records
    }

    pub async fn get(&self, record_id: &str) -> Result<TimerRecord> {
        self.cache
            .read()
            .await
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or_else(|| RecordManagerError::NotFound(record_id.to_string()))
    }

    /// When the history last changed in this process
    pub async fn last_modified(&self) -> Option<DateTime<Utc>> {
        *self.last_modified.read().await
    }

    pub async fn add(&self, record: TimerRecord) -> Result<TimerRecord> {
        record
            .validate()
            .map_err(|e| RecordManagerError::Invalid(e.to_string()))?;

        {
            let mut cache = self.cache.write().await;
            if cache.iter().any(|r| r.id == record.id) {
                return Err(RecordManagerError::Invalid(format!(
                    "Duplicate record id: {}",
                    record.id
                )));
            }

            let to_append = record.clone();
            Self::blocking(self.data_dir.clone(), move |storage| {
                storage.append(&to_append)
            })
            .await?;
            cache.push(record.clone());
        }

        tracing::info!(
            "Added record {} ({}s)",
            record.id,
            record.duration_seconds
        );
        self.touch().await;
        self.event_bus.emit(RecordEvent::added(record.clone()));
        Ok(record)
    }

    pub async fn update(&self, record: TimerRecord) -> Result<TimerRecord> {
        record
            .validate()
            .map_err(|e| RecordManagerError::Invalid(e.to_string()))?;

        {
            let mut cache = self.cache.write().await;
            let index = cache
                .iter()
                .position(|r| r.id == record.id)
                .ok_or_else(|| RecordManagerError::NotFound(record.id.clone()))?;

            let mut updated = cache.clone();
            updated[index] = record.clone();
            let to_save = updated.clone();
            Self::blocking(self.data_dir.clone(), move |storage| {
                storage.save_all(&to_save)
            })
            .await?;
            *cache = updated;
        }

        tracing::info!("Updated record {}", record.id);
        self.touch().await;
        self.event_bus.emit(RecordEvent::updated(record.clone()));
        Ok(record)
    }

    pub async fn delete(&self, record_id: &str) -> Result<TimerRecord> {
        let removed = {
            let mut cache = self.cache.write().await;
            let index = cache
                .iter()
                .position(|r| r.id == record_id)
                .ok_or_else(|| RecordManagerError::NotFound(record_id.to_string()))?;

            let mut remaining = cache.clone();
            let removed = remaining.remove(index);
            let to_save = remaining.clone();
            Self::blocking(self.data_dir.clone(), move |storage| {
                storage.save_all(&to_save)
            })
            .await?;
            *cache = remaining;
            removed
        };

        tracing::info!("Deleted record {}", record_id);
        self.touch().await;
        self.event_bus
            .emit(RecordEvent::deleted(record_id.to_string()));
        Ok(removed)
    }

    /// Remove every record. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let count = {
            let mut cache = self.cache.write().await;
            Self::blocking(self.data_dir.clone(), |storage| storage.clear()).await?;
            let count = cache.len();
            cache.clear();
            count
        };

        tracing::info!("Cleared {} records", count);
        self.touch().await;
        self.event_bus.emit(RecordEvent::AllRecordsCleared);
        Ok(count)
    }

    /// Records that started on or after `since`
    pub async fn since(&self, since: DateTime<Utc>) -> Vec<TimerRecord> {
        self.list()
            .await
            .into_iter()
            .filter(|r| r.start_time >= since)
            .collect()
    }

    pub fn calculate_stats(records: &[TimerRecord]) -> RecordStats {
        let total_duration: u64 = records.iter().map(|r| r.duration_seconds).sum();

        RecordStats {
            total_records: records.len(),
            total_duration_seconds: total_duration,
            avg_duration_seconds: if records.is_empty() {
                0
            } else {
                total_duration / records.len() as u64
            },
        }
    }

    pub async fn stats(&self) -> RecordStats {
        Self::calculate_stats(&self.cache.read().await)
    }

    async fn touch(&self) {
        *self.last_modified.write().await = Some(Utc::now());
    }
}
