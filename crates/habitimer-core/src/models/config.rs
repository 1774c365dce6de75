//! Application settings

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub version: String,
    pub log_level: String,
    /// Minutes of tracked time the user aims for each day
    pub daily_goal_minutes: u64,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::Validation(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.log_level, VALID_LOG_LEVELS
            )));
        }

        if self.daily_goal_minutes == 0 {
            return Err(Error::Validation(
                "Daily goal must be greater than 0".to_string(),
            ));
        }

        if self.daily_goal_minutes > 24 * 60 {
            return Err(Error::Validation(
                "Daily goal cannot exceed 24 hours".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            log_level: "info".to_string(),
            daily_goal_minutes: 60,
        }
    }
}
