use crate::{
    ConfigErrorResult, DEFAULT_LAUNCHER, DEFAULT_RESOURCE_SUBDIR, DEFAULT_RUNTIME_BINARY,
    DEFAULT_RUNTIME_HOME_ENV, validate_relative_name,
};

use serde::Deserialize;

/// The interpreter that hosts the inference server and the script it runs.
///
/// All names are relative to the resource root picked by the host
/// (source tree in development, bundle directory once installed).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter binary name
    pub binary: String,
    /// Launcher script passed as the interpreter's first argument
    pub launcher: String,
    /// Environment variable that points the interpreter at its bundled
    /// standard library when installed (empty = never set)
    pub home_env: String,
    /// Subdirectory of the install dir holding runtime, launcher and model
    pub resource_subdir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: String::from(DEFAULT_RUNTIME_BINARY),
            launcher: String::from(DEFAULT_LAUNCHER),
            home_env: String::from(DEFAULT_RUNTIME_HOME_ENV),
            resource_subdir: String::from(DEFAULT_RESOURCE_SUBDIR),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        validate_relative_name("runtime.binary", &self.binary)?;
        validate_relative_name("runtime.launcher", &self.launcher)?;

        if !self.resource_subdir.is_empty() {
            validate_relative_name("runtime.resource_subdir", &self.resource_subdir)?;
        }

        if self.home_env.contains('=') {
            return Err(crate::ConfigError::runtime(format!(
                "runtime.home_env must be a variable name, got {}",
                self.home_env
            )));
        }

        Ok(())
    }

    /// Variable name for the runtime-home override, if one is configured.
    pub fn home_env(&self) -> Option<&str> {
        let name = self.home_env.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Install subdirectory, if one is configured.
    pub fn resource_subdir(&self) -> Option<&str> {
        let dir = self.resource_subdir.trim();
        (!dir.is_empty()).then_some(dir)
    }
}
