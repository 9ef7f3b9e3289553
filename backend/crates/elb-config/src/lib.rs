mod config;
mod error;
mod lifecycle_config;
mod log_level;
mod logging_config;
mod model_config;
mod runtime_config;
mod server_config;

#[cfg(test)]
mod tests;

pub use config::{CONFIG_DIR_ENV, CONFIG_FILENAME, Config};
pub use error::{ConfigError, ConfigErrorResult};
pub use lifecycle_config::LifecycleConfig;
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use model_config::ModelConfig;
pub use runtime_config::RuntimeConfig;
pub use server_config::ServerConfig;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 56565;
const DEFAULT_GPU_LAYERS: i32 = -1;
const MIN_PORT: u16 = 1024;
const LOOPBACK_HOSTS: [&str; 3] = ["127.0.0.1", "localhost", "::1"];

#[cfg(windows)]
const DEFAULT_RUNTIME_BINARY: &str = "python.exe";
#[cfg(not(windows))]
const DEFAULT_RUNTIME_BINARY: &str = "python";
const DEFAULT_LAUNCHER: &str = "server_runner.py";
const DEFAULT_RUNTIME_HOME_ENV: &str = "PYTHONHOME";
const DEFAULT_RESOURCE_SUBDIR: &str = "_internal";

const DEFAULT_MODEL_FILE: &str = "qwen3-0.6b-q4.gguf";

const DEFAULT_GRACE_TIMEOUT_MS: u64 = 5000;
const MIN_GRACE_TIMEOUT_MS: u64 = 100;
const MAX_GRACE_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_AUTOSTART: bool = true;
const DEFAULT_READINESS_PATH: &str = "/v1/models";
const DEFAULT_READINESS_TIMEOUT_SECS: u64 = 120;
const MAX_READINESS_TIMEOUT_SECS: u64 = 3600;

const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "logs";
const DEFAULT_LOG_FILE_PREFIX: &str = "edge-llm-base";
const DEFAULT_LOG_RETENTION_DAYS: usize = 7;
const MIN_LOG_RETENTION_DAYS: usize = 1;
const MAX_LOG_RETENTION_DAYS: usize = 90;

/// Reject names that are absolute or climb out of their base directory.
fn validate_relative_name(field: &str, value: &str) -> ConfigErrorResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::config(format!("{field} must not be empty")));
    }

    let path = std::path::Path::new(value);
    if path.is_absolute() || value.contains("..") {
        return Err(ConfigError::config(format!(
            "{field} must be relative and cannot contain '..', got {value}"
        )));
    }

    Ok(())
}
