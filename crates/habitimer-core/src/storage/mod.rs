pub mod config;
pub mod preferences;
pub mod record;

pub use config::ConfigStorage;
pub use preferences::{FilePreferences, MemoryPreferences, Preferences};
pub use record::RecordStorage;

use std::path::PathBuf;

use crate::{Error, Result};

pub fn get_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("habitimer"))
        .ok_or_else(|| Error::InvalidData("Could not find data directory".to_string()))
}

/// Create `data_dir` (or the platform default) and return it
pub fn init_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => get_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}
