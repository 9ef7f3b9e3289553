use crate::{
    ConfigError, ConfigErrorResult, DEFAULT_GPU_LAYERS, DEFAULT_HOST, DEFAULT_PORT, LOOPBACK_HOSTS,
    MIN_PORT,
};

use serde::Deserialize;

/// Where the managed inference server listens and how it uses the GPU.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Layers offloaded to the acceleration device (-1 = all, 0 = CPU only)
    pub gpu_layers: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from(DEFAULT_HOST),
            port: DEFAULT_PORT,
            gpu_layers: DEFAULT_GPU_LAYERS,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.port < MIN_PORT {
            return Err(ConfigError::server(format!(
                "server.port must be >= {} (unprivileged), got {}",
                MIN_PORT, self.port
            )));
        }

        // The inference server has no auth; keep it off the network.
        if !LOOPBACK_HOSTS.contains(&self.host.as_str()) {
            return Err(ConfigError::server(format!(
                "server.host must be one of {:?}, got {}",
                LOOPBACK_HOSTS, self.host
            )));
        }

        if self.gpu_layers < -1 {
            return Err(ConfigError::server(format!(
                "server.gpu_layers must be >= -1, got {}",
                self.gpu_layers
            )));
        }

        Ok(())
    }

    /// Bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
