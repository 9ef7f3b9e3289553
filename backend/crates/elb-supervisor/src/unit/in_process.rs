//! The managed server as a blocking run loop inside this process.

use crate::{
    BackingUnit, IN_PROCESS_THREAD_NAME, Launcher, RequiredResource, ResourceKind, ServerSpec,
    SupervisorConfig, SupervisorError, SupervisorResult, UnitExit,
};

use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::Arc;

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

/// A server whose run entry point blocks until it is shut down.
pub trait InProcessServer: Send + Sync + 'static {
    /// Serve `spec` until `shutdown` is cancelled or the server fails.
    fn run(&self, spec: &ServerSpec, shutdown: CancellationToken) -> Result<(), ServeError>;
}

/// Hosts an [`InProcessServer`] on a dedicated thread.
///
/// Shares the supervisor's address space: a panic is caught and reported
/// as an unexpected exit, but a server that aborts or corrupts memory
/// takes the host down with it.
pub struct InProcessLauncher {
    server: Arc<dyn InProcessServer>,
}

impl InProcessLauncher {
    pub fn new(server: Arc<dyn InProcessServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Launcher for InProcessLauncher {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn required_resources(&self, config: &SupervisorConfig) -> Vec<RequiredResource> {
        vec![RequiredResource::new(ResourceKind::Model, &config.model)]
    }

    async fn launch(&self, config: &SupervisorConfig) -> SupervisorResult<BackingUnit> {
        let spec = config.server_spec();
        let server = Arc::clone(&self.server);
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let (activate_tx, activate_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = watch::channel(None);

        std::thread::Builder::new()
            .name(IN_PROCESS_THREAD_NAME.to_string())
            .spawn(move || {
                if activate_rx.blocking_recv().is_err() {
                    debug!("Server thread released before activation");
                    exit_tx.send_replace(Some(UnitExit::failed("never activated")));
                    return;
                }

                info!("Server run loop entered on {}", spec.bind_addr());
                let exit = match catch_unwind(AssertUnwindSafe(|| server.run(&spec, token))) {
                    Ok(Ok(())) => UnitExit {
                        code: Some(0),
                        success: true,
                        detail: String::from("run loop returned"),
                    },
                    Ok(Err(e)) => UnitExit::failed(format!("run loop failed: {e}")),
                    Err(panic) => UnitExit::failed(format!(
                        "run loop panicked: {}",
                        panic_message(panic.as_ref())
                    )),
                };
                exit_tx.send_replace(Some(exit));
            })
            .map_err(|source| SupervisorError::WorkerSpawn {
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(BackingUnit::task(
            IN_PROCESS_THREAD_NAME.to_string(),
            shutdown,
            activate_tx,
            exit_rx,
        ))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}
