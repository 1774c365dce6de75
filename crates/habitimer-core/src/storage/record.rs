//! History record storage (CSV format)

use crate::{models::TimerRecord, Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const RECORDS_FILE: &str = "records.csv";
const HEADERS: [&str; 5] = ["id", "start_time", "end_time", "duration_seconds", "note"];

#[derive(Debug, Serialize, Deserialize)]
struct RecordCsv {
    id: String,
    start_time: String,
    end_time: String,
    duration_seconds: u64,
    note: String,
}

impl From<&TimerRecord> for RecordCsv {
    fn from(record: &TimerRecord) -> Self {
        Self {
            id: record.id.clone(),
            start_time: record.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            end_time: record.end_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_seconds: record.duration_seconds,
            note: record.note.clone().unwrap_or_default(),
        }
    }
}

impl TryFrom<RecordCsv> for TimerRecord {
    type Error = Error;

    fn try_from(csv: RecordCsv) -> Result<Self> {
        Ok(Self {
            id: csv.id,
            start_time: parse_time("start_time", &csv.start_time)?,
            end_time: parse_time("end_time", &csv.end_time)?,
            duration_seconds: csv.duration_seconds,
            note: if csv.note.is_empty() {
                None
            } else {
                Some(csv.note)
            },
        })
    }
}

fn parse_time(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::InvalidData(format!("Invalid {}: {}", field, e)))
}

pub struct RecordStorage {
    data_dir: PathBuf,
}

impl RecordStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn records_path(&self) -> PathBuf {
        self.data_dir.join(RECORDS_FILE)
    }

    pub fn load(&self) -> Result<Vec<TimerRecord>> {
        let records_path = self.records_path();

        if !records_path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(records_path)?;
        let mut records = Vec::new();

        for result in reader.deserialize() {
            let record_csv: RecordCsv = result?;
            records.push(TimerRecord::try_from(record_csv)?);
        }

        Ok(records)
    }

    pub fn append(&self, record: &TimerRecord) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.records_path())?;

        // A zero-length file (new, or truncated by a crash) still needs a header
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(HEADERS)?;
        }

        writer.serialize(RecordCsv::from(record))?;
        writer.flush()?;

        Ok(())
    }

    /// Rewrite the whole file; an empty slice removes it
    pub fn save_all(&self, records: &[TimerRecord]) -> Result<()> {
        if records.is_empty() {
            return self.clear();
        }

        std::fs::create_dir_all(&self.data_dir)?;

        let mut writer = csv::Writer::from_path(self.records_path())?;
        for record in records {
            writer.serialize(RecordCsv::from(record))?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(self.records_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn record_at(minute: u32, note: Option<&str>) -> TimerRecord {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).unwrap();
        TimerRecord::new(start, start + Duration::minutes(10))
            .unwrap()
            .with_note(note.map(str::to_string))
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp_dir.path().to_path_buf());
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_append_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp_dir.path().to_path_buf());

        let first = record_at(0, Some("reading, chapter 3"));
        let second = record_at(30, None);
        storage.append(&first).unwrap();
        storage.append(&second).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn test_save_all_after_clear_keeps_header() {
        let temp_dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp_dir.path().to_path_buf());

        storage.append(&record_at(0, None)).unwrap();
        storage.save_all(&[]).unwrap();
        assert!(storage.load().unwrap().is_empty());

        let record = record_at(15, Some("run"));
        storage.append(&record).unwrap();
        assert_eq!(storage.load().unwrap(), vec![record]);
    }

    #[test]
    fn test_append_to_empty_file_writes_header() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(RECORDS_FILE), "").unwrap();
        let storage = RecordStorage::new(temp_dir.path().to_path_buf());

        let record = record_at(0, None);
        storage.append(&record).unwrap();

        assert_eq!(storage.load().unwrap(), vec![record]);
    }

    #[test]
    fn test_clear_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp_dir.path().to_path_buf());
        storage.clear().unwrap();
    }

    #[test]
    fn test_corrupt_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(RECORDS_FILE),
            "id,start_time,end_time,duration_seconds,note\nabc,yesterday,today,5,\n",
        )
        .unwrap();

        let storage = RecordStorage::new(temp_dir.path().to_path_buf());
        assert!(matches!(storage.load(), Err(Error::InvalidData(_))));
    }
}
