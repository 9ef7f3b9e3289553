use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_LOG_DIRECTORY, DEFAULT_LOG_FILE_PREFIX,
    DEFAULT_LOG_LEVEL, DEFAULT_LOG_RETENTION_DAYS, LogLevel, MAX_LOG_RETENTION_DAYS,
    MIN_LOG_RETENTION_DAYS, validate_relative_name,
};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Log directory, relative to the install (or source) root
    pub dir: String,
    /// Rotated files are named `<prefix>.<date>.log`
    pub file_prefix: String,
    pub colored: bool,
    /// Number of daily log files kept
    pub retention_days: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel(DEFAULT_LOG_LEVEL),
            dir: String::from(DEFAULT_LOG_DIRECTORY),
            file_prefix: String::from(DEFAULT_LOG_FILE_PREFIX),
            colored: true,
            retention_days: DEFAULT_LOG_RETENTION_DAYS,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        validate_relative_name("logging.dir", &self.dir)?;

        if self.file_prefix.trim().is_empty() {
            return Err(ConfigError::logging("logging.file_prefix must not be empty"));
        }

        if self.retention_days < MIN_LOG_RETENTION_DAYS
            || self.retention_days > MAX_LOG_RETENTION_DAYS
        {
            return Err(ConfigError::logging(format!(
                "logging.retention_days must be {}-{}, got {}",
                MIN_LOG_RETENTION_DAYS, MAX_LOG_RETENTION_DAYS, self.retention_days
            )));
        }

        Ok(())
    }
}
