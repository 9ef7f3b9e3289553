use crate::{READINESS_POLL_INTERVAL, ResourceLocator};

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use elb_config::Config;

/// What the managed server is told to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSpec {
    pub host: String,
    pub port: u16,
    pub model: PathBuf,
    /// Layers offloaded to the accelerator; -1 offloads all
    pub gpu_layers: i32,
}

impl ServerSpec {
    /// `host:port`, with IPv6 hosts bracketed.
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Polling of the server's HTTP surface after launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessSettings {
    pub path: String,
    pub timeout: Duration,
    pub interval: Duration,
}

/// Everything a launch needs, resolved once at host start.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub host: String,
    pub port: u16,
    pub gpu_layers: i32,
    pub runtime: PathBuf,
    pub launcher: PathBuf,
    pub model: PathBuf,
    /// Extra environment for the launched runtime
    pub env: Vec<(String, String)>,
    pub grace_timeout: Duration,
    pub readiness: Option<ReadinessSettings>,
}

impl SupervisorConfig {
    pub fn resolve(config: &Config, locator: &ResourceLocator) -> Self {
        let mut env = Vec::new();
        if let Some(name) = config.runtime.home_env()
            && let Some(home) = locator.runtime_home()
        {
            env.push((name.to_string(), home.display().to_string()));
        }

        let readiness = config
            .lifecycle
            .readiness_timeout()
            .map(|timeout| ReadinessSettings {
                path: config.lifecycle.readiness_path.clone(),
                timeout,
                interval: READINESS_POLL_INTERVAL,
            });

        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            gpu_layers: config.server.gpu_layers,
            runtime: locator.runtime_binary(&config.runtime),
            launcher: locator.launcher_script(&config.runtime),
            model: locator.model_file(&config.model),
            env,
            grace_timeout: config.lifecycle.grace_timeout(),
            readiness,
        }
    }

    pub fn server_spec(&self) -> ServerSpec {
        ServerSpec {
            host: self.host.clone(),
            port: self.port,
            model: self.model.clone(),
            gpu_layers: self.gpu_layers,
        }
    }

    /// Arguments following the launcher script on the command line.
    pub fn server_args(&self) -> Vec<OsString> {
        vec![
            OsString::from("--model"),
            self.model.clone().into_os_string(),
            OsString::from("--port"),
            OsString::from(self.port.to_string()),
            OsString::from("--host"),
            OsString::from(&self.host),
            OsString::from("--n_gpu_layers"),
            OsString::from(self.gpu_layers.to_string()),
        ]
    }

    /// The launcher runs from its own directory.
    pub fn working_dir(&self) -> &Path {
        self.launcher.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn grace_ms(&self) -> u64 {
        u64::try_from(self.grace_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}
