//! Timer history record

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finished timing session, as shown on the history screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    pub note: Option<String>,
}

impl TimerRecord {
    /// Create a record for a session that ran from `start_time` to `end_time`
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<Self> {
        if end_time <= start_time {
            return Err(Error::Validation(
                "End time must be after start time".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            start_time,
            end_time,
            duration_seconds: Self::seconds_between(start_time, end_time),
            note: None,
        })
    }

    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.set_note(note);
        self
    }

    /// Set or clear the note; blank notes are stored as `None`
    pub fn set_note(&mut self, note: Option<String>) {
        self.note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
    }

    /// Move the end of the session, recomputing the duration
    pub fn set_end_time(&mut self, end_time: DateTime<Utc>) -> Result<()> {
        if end_time <= self.start_time {
            return Err(Error::Validation(
                "End time must be after start time".to_string(),
            ));
        }

        self.end_time = end_time;
        self.duration_seconds = Self::seconds_between(self.start_time, end_time);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::Validation("Record id cannot be empty".to_string()));
        }

        if self.end_time <= self.start_time {
            return Err(Error::Validation(
                "End time must be after start time".to_string(),
            ));
        }

        Ok(())
    }

    pub fn duration_minutes(&self) -> u64 {
        self.duration_seconds / 60
    }

    fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
        end.signed_duration_since(start).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_record() {
        let start = Utc::now();
        let record = TimerRecord::new(start, start + Duration::minutes(25)).unwrap();

        assert_eq!(record.duration_seconds, 1500);
        assert_eq!(record.duration_minutes(), 25);
        assert!(record.note.is_none());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let start = Utc::now();
        assert!(TimerRecord::new(start, start).is_err());
        assert!(TimerRecord::new(start, start - Duration::seconds(1)).is_err());
    }

    #[test]
    fn test_blank_note_is_dropped() {
        let start = Utc::now();
        let record = TimerRecord::new(start, start + Duration::seconds(5))
            .unwrap()
            .with_note(Some("   ".to_string()));
        assert!(record.note.is_none());

        let record = record.with_note(Some(" reading ".to_string()));
        assert_eq!(record.note.as_deref(), Some("reading"));
    }

    #[test]
    fn test_set_end_time() {
        let start = Utc::now();
        let mut record = TimerRecord::new(start, start + Duration::seconds(10)).unwrap();

        record.set_end_time(start + Duration::seconds(90)).unwrap();
        assert_eq!(record.duration_seconds, 90);

        assert!(record.set_end_time(start - Duration::seconds(1)).is_err());
        assert_eq!(record.duration_seconds, 90);
    }
}
