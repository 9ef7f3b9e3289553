#![allow(dead_code)]

use elb_supervisor::{
    BaseKind, ResourceLocator, ServiceState, ServiceSupervisor, StateSnapshot, SupervisorConfig,
};

use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use elb_config::Config;
use tempfile::TempDir;

pub const TEST_GRACE_MS: u64 = 500;

/// Exits as soon as it is asked to stop.
pub const COOPERATIVE_SERVER: &str = r#"
trap 'exit 0' TERM
while true; do sleep 0.05; done
"#;

/// Ignores the cooperative signal; only a kill ends it.
pub const STUBBORN_SERVER: &str = r#"
trap '' TERM
while true; do sleep 0.05; done
"#;

/// Dies on its own shortly after starting.
pub const CRASHING_SERVER: &str = r#"
sleep 0.2
echo "model load failed" >&2
exit 3
"#;

/// Records how it was invoked, then behaves cooperatively.
pub const RECORDING_SERVER: &str = r#"
printf '%s\n' "$PWD" "$*" "${PYTHONHOME:-unset}" > invocation.txt
trap 'exit 0' TERM
while true; do sleep 0.05; done
"#;

/// A bundle laid out in a temp dir whose launcher script is `script`.
///
/// The runtime is `/bin/sh`, so the script is interpreted rather than
/// executed directly.
pub struct ScriptedServer {
    pub dir: TempDir,
    pub config: SupervisorConfig,
}

impl ScriptedServer {
    pub fn development(script: &str) -> Self {
        Self::build(BaseKind::Development, script)
    }

    pub fn installed(script: &str) -> Self {
        Self::build(BaseKind::Installed, script)
    }

    fn build(kind: BaseKind, script: &str) -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.server.port = free_port();
        config.lifecycle.grace_timeout_ms = TEST_GRACE_MS;
        config.lifecycle.readiness_timeout_secs = 0;
        config.runtime.launcher = String::from("server.sh");

        let locator = ResourceLocator::new(kind, dir.path(), config.runtime.resource_subdir());
        std::fs::create_dir_all(locator.resource_root()).unwrap();

        let mut config = SupervisorConfig::resolve(&config, &locator);
        config.runtime = PathBuf::from("/bin/sh");
        std::fs::write(&config.launcher, script).unwrap();
        std::fs::write(&config.model, b"").unwrap();

        Self { dir, config }
    }

    pub fn supervisor(&self) -> ServiceSupervisor {
        ServiceSupervisor::new(Arc::new(self.config.clone()))
    }
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

pub async fn wait_for_state(supervisor: &ServiceSupervisor, state: ServiceState) -> StateSnapshot {
    let mut rx = supervisor.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(|s| s.state == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed")
        .clone();
    snapshot
}

/// Whether a process with `pid` still exists (zombies included).
pub fn process_exists(pid: u32) -> bool {
    PathBuf::from(format!("/proc/{pid}")).exists()
}

/// Collects formatted log output so tests can assert on lifecycle lines.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events here until the guard is dropped.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let capture = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || capture.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
