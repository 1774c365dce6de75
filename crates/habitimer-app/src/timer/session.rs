//! Start/stop flow of a timing session

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use habitimer_core::models::TimerRecord;

use super::store::{TimerStore, TimerStoreError};
use crate::history::{RecordManager, RecordManagerError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No timer is running")]
    NotRunning,

    #[error("Timer store error: {0}")]
    Store(#[from] TimerStoreError),

    #[error("History error: {0}")]
    History(#[from] RecordManagerError),

    #[error("Invalid session: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Running {
        started_at: DateTime<Utc>,
        elapsed: Duration,
    },
}

pub struct TimerSession {
    store: Arc<TimerStore>,
    records: Arc<RecordManager>,
}

impl TimerSession {
    pub fn new(store: Arc<TimerStore>, records: Arc<RecordManager>) -> Self {
        Self { store, records }
    }

    /// Start timing at `now`. A session already running is replaced without
    /// being recorded.
    pub async fn start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if let Some(previous) = self.store.start_time().await {
            tracing::warn!("Discarding running session started at {}", previous);
        }

        self.store.set_start_time(now).await?;
        Ok(self.store.start_time().await.unwrap_or(now))
    }

    /// Finish the running session, saving it to the history
    pub async fn stop(&self, now: DateTime<Utc>, note: Option<String>) -> Result<TimerRecord> {
        let started_at = self.running_since().await?.ok_or(SessionError::NotRunning)?;

        let record = TimerRecord::new(started_at, now)
            .map_err(|e| SessionError::Invalid(e.to_string()))?
            .with_note(note);

        // Clear first: a session must never be both running and recorded
        self.store.clear_start_time().await?;

        match self.records.add(record).await {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Err(restore_err) = self.store.set_start_time(started_at).await {
                    tracing::error!(
                        "Failed to restore start time {} after history error: {}",
                        started_at,
                        restore_err
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Drop the running session without recording it
    pub async fn cancel(&self) -> Result<()> {
        self.store.clear_start_time().await?;
        Ok(())
    }

    pub async fn status(&self, now: DateTime<Utc>) -> Result<SessionStatus> {
        Ok(match self.running_since().await? {
            Some(started_at) => SessionStatus::Running {
                started_at,
                elapsed: (now - started_at).max(Duration::zero()),
            },
            None => SessionStatus::Idle,
        })
    }

    /// In-memory start time, falling back to the persisted one
    async fn running_since(&self) -> Result<Option<DateTime<Utc>>> {
        if let Some(started_at) = self.store.start_time().await {
            return Ok(Some(started_at));
        }
        Ok(self.store.restore().await?)
    }
}
