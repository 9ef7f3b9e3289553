use crate::{
    ConfigError, ConfigErrorResult, LifecycleConfig, LoggingConfig, ModelConfig, RuntimeConfig,
    ServerConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

/// Overrides the directory holding `config.toml`.
pub const CONFIG_DIR_ENV: &str = "ELB_CONFIG_DIR";
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub runtime: RuntimeConfig,
    pub model: ModelConfig,
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config for a host.
    ///
    /// Loading order:
    /// 1. ELB_CONFIG_DIR env var, else `default_dir` chosen by the host
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply ELB_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load(default_dir: &Path) -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir(default_dir);

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load and parse TOML file with detailed error context.
    fn load_toml(path: &PathBuf) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.clone(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: ELB_CONFIG_DIR env var > `default_dir`
    pub fn config_dir(default_dir: &Path) -> PathBuf {
        match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_dir.to_path_buf(),
        }
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.server.validate()?;
        self.runtime.validate()?;
        self.model.validate()?;
        self.lifecycle.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  server: {} (gpu_layers {})",
            self.server.bind_addr(),
            self.server.gpu_layers
        );
        info!(
            "  runtime: {} {} (home env: {}, subdir: {})",
            self.runtime.binary,
            self.runtime.launcher,
            self.runtime.home_env().unwrap_or("none"),
            self.runtime.resource_subdir().unwrap_or("none")
        );
        info!("  model: {}", self.model.file);
        info!(
            "  lifecycle: grace={}ms, autostart={}, readiness={} ({}s)",
            self.lifecycle.grace_timeout_ms,
            self.lifecycle.autostart,
            self.lifecycle.readiness_path,
            self.lifecycle.readiness_timeout_secs
        );
        info!(
            "  logging: {} in {}/{} (colored: {}, keep {} days)",
            *self.logging.level,
            self.logging.dir,
            self.logging.file_prefix,
            self.logging.colored,
            self.logging.retention_days
        );
    }

    fn apply_env_overrides(&mut self) {
        // Server
        Self::apply_env_string("ELB_SERVER_HOST", &mut self.server.host);
        Self::apply_env_parse("ELB_SERVER_PORT", &mut self.server.port);
        Self::apply_env_parse("ELB_SERVER_GPU_LAYERS", &mut self.server.gpu_layers);

        // Runtime
        Self::apply_env_string("ELB_RUNTIME_BINARY", &mut self.runtime.binary);
        Self::apply_env_string("ELB_RUNTIME_LAUNCHER", &mut self.runtime.launcher);
        Self::apply_env_string("ELB_RUNTIME_HOME_ENV", &mut self.runtime.home_env);
        Self::apply_env_string(
            "ELB_RUNTIME_RESOURCE_SUBDIR",
            &mut self.runtime.resource_subdir,
        );

        // Model
        Self::apply_env_string("ELB_MODEL_FILE", &mut self.model.file);

        // Lifecycle
        Self::apply_env_parse(
            "ELB_GRACE_TIMEOUT_MS",
            &mut self.lifecycle.grace_timeout_ms,
        );
        Self::apply_env_bool("ELB_AUTOSTART", &mut self.lifecycle.autostart);
        Self::apply_env_string("ELB_READINESS_PATH", &mut self.lifecycle.readiness_path);
        Self::apply_env_parse(
            "ELB_READINESS_TIMEOUT_SECS",
            &mut self.lifecycle.readiness_timeout_secs,
        );

        // Logging
        Self::apply_env_parse("ELB_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_string("ELB_LOG_DIR", &mut self.logging.dir);
        Self::apply_env_string("ELB_LOG_FILE_PREFIX", &mut self.logging.file_prefix);
        Self::apply_env_bool("ELB_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_parse(
            "ELB_LOG_RETENTION_DAYS",
            &mut self.logging.retention_days,
        );
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }
}
