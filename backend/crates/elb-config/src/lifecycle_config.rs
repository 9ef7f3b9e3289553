use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_AUTOSTART, DEFAULT_GRACE_TIMEOUT_MS,
    DEFAULT_READINESS_PATH, DEFAULT_READINESS_TIMEOUT_SECS, MAX_GRACE_TIMEOUT_MS,
    MAX_READINESS_TIMEOUT_SECS, MIN_GRACE_TIMEOUT_MS,
};

use std::time::Duration;

use serde::Deserialize;

/// Start/stop behaviour of the supervised server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long a cooperative shutdown may take before the server is killed
    pub grace_timeout_ms: u64,
    /// Start the server as soon as the host is up
    pub autostart: bool,
    /// HTTP path polled to learn when the model has finished loading
    pub readiness_path: String,
    /// Give up polling after this many seconds (0 = no probe)
    pub readiness_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_timeout_ms: DEFAULT_GRACE_TIMEOUT_MS,
            autostart: DEFAULT_AUTOSTART,
            readiness_path: String::from(DEFAULT_READINESS_PATH),
            readiness_timeout_secs: DEFAULT_READINESS_TIMEOUT_SECS,
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.grace_timeout_ms < MIN_GRACE_TIMEOUT_MS
            || self.grace_timeout_ms > MAX_GRACE_TIMEOUT_MS
        {
            return Err(ConfigError::lifecycle(format!(
                "lifecycle.grace_timeout_ms must be {}-{}, got {}",
                MIN_GRACE_TIMEOUT_MS, MAX_GRACE_TIMEOUT_MS, self.grace_timeout_ms
            )));
        }

        if self.readiness_timeout_secs > MAX_READINESS_TIMEOUT_SECS {
            return Err(ConfigError::lifecycle(format!(
                "lifecycle.readiness_timeout_secs must be 0-{}, got {}",
                MAX_READINESS_TIMEOUT_SECS, self.readiness_timeout_secs
            )));
        }

        if !self.readiness_path.starts_with('/') {
            return Err(ConfigError::lifecycle(format!(
                "lifecycle.readiness_path must start with '/', got {}",
                self.readiness_path
            )));
        }

        Ok(())
    }

    pub fn grace_timeout(&self) -> Duration {
        Duration::from_millis(self.grace_timeout_ms)
    }

    /// Probe deadline, or `None` when the probe is disabled.
    pub fn readiness_timeout(&self) -> Option<Duration> {
        (self.readiness_timeout_secs > 0).then(|| Duration::from_secs(self.readiness_timeout_secs))
    }
}
