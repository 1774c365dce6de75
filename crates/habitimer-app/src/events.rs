use habitimer_core::models::TimerRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dispatch key for the event bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RecordAdded,
    RecordUpdated,
    RecordDeleted,
    AllRecordsCleared,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::RecordAdded,
        EventKind::RecordUpdated,
        EventKind::RecordDeleted,
        EventKind::AllRecordsCleared,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RecordAdded => "record_added",
            EventKind::RecordUpdated => "record_updated",
            EventKind::RecordDeleted => "record_deleted",
            EventKind::AllRecordsCleared => "all_records_cleared",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// A change to the timer history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordEvent {
    RecordAdded { record: TimerRecord },
    RecordUpdated { record: TimerRecord },
    RecordDeleted { record_id: String },
    AllRecordsCleared,
}

impl RecordEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RecordEvent::RecordAdded { .. } => EventKind::RecordAdded,
            RecordEvent::RecordUpdated { .. } => EventKind::RecordUpdated,
            RecordEvent::RecordDeleted { .. } => EventKind::RecordDeleted,
            RecordEvent::AllRecordsCleared => EventKind::AllRecordsCleared,
        }
    }

    pub fn added(record: TimerRecord) -> Self {
        RecordEvent::RecordAdded { record }
    }

    pub fn updated(record: TimerRecord) -> Self {
        RecordEvent::RecordUpdated { record }
    }

    pub fn deleted(record_id: String) -> Self {
        RecordEvent::RecordDeleted { record_id }
    }
}
