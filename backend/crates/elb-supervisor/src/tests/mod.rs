
use crate::{
    BackingUnit, BaseKind, InProcessLauncher, InProcessServer, Launcher, RequiredResource,
    ResourceLocator, ServeError, ServerSpec, ServiceState, ServiceSupervisor, StateSnapshot,
    SupervisorConfig, SupervisorError, SupervisorResult,
};

use std::io::{Read, Write};
use std::net::TcpListener;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use elb_config::Config;
use error_location::ErrorLocation;
use tempfile::TempDir;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub(crate) const TEST_GRACE_MS: u64 = 300;

/// A development layout in a temp dir with every required file present.
pub(crate) struct Fixture {
    pub dir: TempDir,
    pub config: SupervisorConfig,
}

pub(crate) fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.server.port = free_port();
    config.lifecycle.grace_timeout_ms = TEST_GRACE_MS;
    config.lifecycle.readiness_timeout_secs = 0;

    let locator = ResourceLocator::new(
        BaseKind::Development,
        dir.path(),
        config.runtime.resource_subdir(),
    );
    let config = SupervisorConfig::resolve(&config, &locator);

    for path in [&config.runtime, &config.launcher, &config.model] {
        std::fs::write(path, b"").unwrap();
    }

    Fixture { dir, config }
}

pub(crate) fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// What the fake server does once its trigger is set.
#[derive(Debug, Clone, Copy)]
pub(crate) enum OnTrigger {
    ReturnError,
    Panic,
}

/// Stand-in for the inference server's blocking run loop.
#[derive(Default)]
pub(crate) struct FakeServer {
    /// Keep running after shutdown is requested
    pub ignore_shutdown: bool,
    pub on_trigger: Option<OnTrigger>,
    /// Answer HTTP requests on the bind address
    pub serve_http: bool,
    pub trigger: AtomicBool,
    /// Lets a server that ignores shutdown finish at the end of a test
    pub release: AtomicBool,
    pub runs: AtomicUsize,
    pub live: AtomicUsize,
    pub max_live: AtomicUsize,
    /// Supervisor state feed, checked on entry to the run loop
    pub state: OnceLock<watch::Receiver<StateSnapshot>>,
    pub saw_running_on_entry: AtomicBool,
}

impl FakeServer {
    fn enter(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        if let Some(rx) = self.state.get() {
            let running = rx.borrow().state == ServiceState::Running;
            self.saw_running_on_entry.store(running, Ordering::SeqCst);
        }
    }

    fn leave(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InProcessServer for FakeServer {
    fn run(&self, spec: &ServerSpec, shutdown: CancellationToken) -> Result<(), ServeError> {
        self.enter();

        let listener = if self.serve_http {
            let listener = TcpListener::bind(spec.bind_addr())?;
            listener.set_nonblocking(true)?;
            Some(listener)
        } else {
            None
        };

        let result = loop {
            if self.trigger.load(Ordering::SeqCst) {
                match self.on_trigger {
                    Some(OnTrigger::ReturnError) => break Err("simulated crash".into()),
                    Some(OnTrigger::Panic) => {
                        self.leave();
                        panic!("simulated panic");
                    }
                    None => {}
                }
            }
            if (shutdown.is_cancelled() && !self.ignore_shutdown)
                || self.release.load(Ordering::SeqCst)
            {
                break Ok(());
            }
            if let Some(listener) = &listener
                && let Ok((stream, _)) = listener.accept()
            {
                answer_ok(stream);
            }
            std::thread::sleep(Duration::from_millis(5));
        };

        self.leave();
        result
    }
}

fn answer_ok(mut stream: std::net::TcpStream) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let _ = stream
        .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}");
}

/// Wraps the in-process launcher, counting launches and optionally
/// slowing them down.
pub(crate) struct RecordingLauncher {
    inner: InProcessLauncher,
    delay: Duration,
    pub launches: AtomicUsize,
}

impl RecordingLauncher {
    pub(crate) fn new(server: Arc<FakeServer>, delay: Duration) -> Self {
        Self {
            inner: InProcessLauncher::new(server),
            delay,
            launches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Launcher for RecordingLauncher {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn required_resources(&self, config: &SupervisorConfig) -> Vec<RequiredResource> {
        self.inner.required_resources(config)
    }

    async fn launch(&self, config: &SupervisorConfig) -> SupervisorResult<BackingUnit> {
        tokio::time::sleep(self.delay).await;
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.inner.launch(config).await
    }
}

/// A launcher whose launch call always fails.
pub(crate) struct FailingLauncher;

#[async_trait]
impl Launcher for FailingLauncher {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn required_resources(&self, _config: &SupervisorConfig) -> Vec<RequiredResource> {
        Vec::new()
    }

    async fn launch(&self, _config: &SupervisorConfig) -> SupervisorResult<BackingUnit> {
        Err(SupervisorError::WorkerSpawn {
            source: std::io::Error::other("no threads left"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

pub(crate) fn in_process(fixture: &Fixture, server: Arc<FakeServer>) -> ServiceSupervisor {
    ServiceSupervisor::with_launcher(
        Arc::new(fixture.config.clone()),
        Arc::new(InProcessLauncher::new(server)),
    )
}

/// Collects formatted log output so tests can assert on lifecycle lines.
#[derive(Clone, Default)]
pub(crate) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events here until the guard is dropped.
    ///
    /// Only covers tasks polled on the test thread, so pair it with the
    /// default current-thread test runtime.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let capture = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || capture.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Wait until the supervisor publishes `state`.
pub(crate) async fn wait_for_state(
    supervisor: &ServiceSupervisor,
    state: ServiceState,
) -> StateSnapshot {
    let mut rx = supervisor.subscribe();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| s.state == state))
        .await
        .expect("state not reached in time")
        .expect("state channel closed")
        .clone();
    snapshot
}

/// Wait until `probe` holds.
pub(crate) async fn eventually(probe: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if probe() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
