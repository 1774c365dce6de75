//! Persisted start time of the running timer
//!
//! At most one start time exists. It lives in memory for the current process
//! and in local storage so a session survives the app being killed.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use habitimer_core::storage::Preferences;

pub const START_TIME_KEY: &str = "timer_start_time";

#[derive(Debug, thiserror::Error)]
pub enum TimerStoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] habitimer_core::Error),

    #[error("Stored start time is not a valid timestamp: '{value}'")]
    MalformedStartTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, TimerStoreError>;

pub struct TimerStore {
    preferences: Arc<dyn Preferences>,
    start_time: RwLock<Option<DateTime<Utc>>>,
}

impl TimerStore {
    pub fn new(preferences: Arc<dyn Preferences>) -> Self {
        Self {
            preferences,
            start_time: RwLock::new(None),
        }
    }

    /// In-memory start time; does not touch storage
    pub async fn start_time(&self) -> Option<DateTime<Utc>> {
        *self.start_time.read().await
    }

    /// Record `time` as the start of the running session, replacing any
    /// previous one. Memory is updated before the write and stays updated if
    /// the write fails.
    pub async fn set_start_time(&self, time: DateTime<Utc>) -> Result<()> {
        let time = time.trunc_subsecs(3);
        *self.start_time.write().await = Some(time);

        self.preferences
            .set(START_TIME_KEY, &format_timestamp(time))
            .await?;

        tracing::info!("Timer start time set to {}", format_timestamp(time));
        Ok(())
    }

    /// Read the persisted start time. `None` when nothing (or an empty string)
    /// is stored.
    pub async fn get_start_time(&self) -> Result<Option<DateTime<Utc>>> {
        let value = match self.preferences.get(START_TIME_KEY).await? {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(None),
        };

        match parse_timestamp(&value) {
            Ok(time) => Ok(Some(time)),
            Err(source) => {
                tracing::warn!("Malformed timer start time '{}'", value);
                Err(TimerStoreError::MalformedStartTime { value, source })
            }
        }
    }

    pub async fn clear_start_time(&self) -> Result<()> {
        *self.start_time.write().await = None;
        self.preferences.remove(START_TIME_KEY).await?;
        tracing::info!("Timer start time cleared");
        Ok(())
    }

    /// Load the persisted start time into memory, e.g. after a restart
    pub async fn restore(&self) -> Result<Option<DateTime<Utc>>> {
        let persisted = self.get_start_time().await?;
        *self.start_time.write().await = persisted;

        if let Some(time) = persisted {
            tracing::info!("Restored running timer started at {}", format_timestamp(time));
        }
        Ok(persisted)
    }

    /// Time elapsed since the in-memory start time, `None` when idle.
    /// A start time in the future counts as zero.
    pub async fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.start_time()
            .await
            .map(|start| (now - start).max(Duration::zero()))
    }
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Years outside 0000-9999 are written with a sign (`+10000-...`), which
/// RFC 3339 parsing rejects; `%Y` accepts them.
fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(time) => Ok(time.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.fZ")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}
