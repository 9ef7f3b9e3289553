//! Backing units: the running instance of the managed server.

mod in_process;
mod process;

pub use in_process::{InProcessLauncher, InProcessServer, ServeError};
pub use process::ProcessLauncher;

use crate::{ResourceKind, SupervisorConfig, SupervisorResult};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A file checked by preflight before anything is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredResource {
    pub kind: ResourceKind,
    pub path: PathBuf,
}

impl RequiredResource {
    pub fn new(kind: ResourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// How a backing unit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitExit {
    pub code: Option<i32>,
    pub success: bool,
    pub detail: String,
}

impl UnitExit {
    pub(crate) fn failed(detail: impl Into<String>) -> Self {
        Self {
            code: None,
            success: false,
            detail: detail.into(),
        }
    }
}

/// Creates backing units.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Files that must exist before `launch` may be called.
    fn required_resources(&self, config: &SupervisorConfig) -> Vec<RequiredResource>;

    /// Create the unit. Returning means the launch call itself succeeded;
    /// the unit may still die later, which its exit watch reports.
    async fn launch(&self, config: &SupervisorConfig) -> SupervisorResult<BackingUnit>;
}

enum Control {
    Process {
        pid: Option<u32>,
        kill_tx: Option<oneshot::Sender<()>>,
    },
    Task {
        thread: String,
        shutdown: CancellationToken,
        activate_tx: Option<oneshot::Sender<()>>,
    },
}

/// Exclusive handle to one launched unit.
///
/// The exit watch holds `None` until the unit ends and then the single
/// [`UnitExit`] describing how.
pub struct BackingUnit {
    control: Control,
    exit_rx: watch::Receiver<Option<UnitExit>>,
}

impl BackingUnit {
    pub(crate) fn process(
        pid: Option<u32>,
        kill_tx: oneshot::Sender<()>,
        exit_rx: watch::Receiver<Option<UnitExit>>,
    ) -> Self {
        Self {
            control: Control::Process {
                pid,
                kill_tx: Some(kill_tx),
            },
            exit_rx,
        }
    }

    pub(crate) fn task(
        thread: String,
        shutdown: CancellationToken,
        activate_tx: oneshot::Sender<()>,
        exit_rx: watch::Receiver<Option<UnitExit>>,
    ) -> Self {
        Self {
            control: Control::Task {
                thread,
                shutdown,
                activate_tx: Some(activate_tx),
            },
            exit_rx,
        }
    }

    /// `pid=<n>` for processes, `thread=<name>` for in-process tasks.
    pub fn describe(&self) -> String {
        match &self.control {
            Control::Process { pid: Some(pid), .. } => format!("pid={pid}"),
            Control::Process { pid: None, .. } => String::from("pid=?"),
            Control::Task { thread, .. } => format!("thread={thread}"),
        }
    }

    /// Let an in-process unit enter its run loop.
    ///
    /// Called once `Running` has been published, because the run loop blocks
    /// for the server's whole lifetime. Processes are already running.
    pub fn activate(&mut self) {
        if let Control::Task { activate_tx, .. } = &mut self.control
            && let Some(tx) = activate_tx.take()
        {
            let _ = tx.send(());
        }
    }

    /// Ask the unit to shut down on its own.
    pub fn request_shutdown(&self) -> SupervisorResult<()> {
        match &self.control {
            Control::Process { pid: Some(pid), .. } => {
                if self.exit().is_some() {
                    return Ok(());
                }
                process::signal_graceful(*pid)
            }
            Control::Process { pid: None, .. } => Ok(()),
            Control::Task { shutdown, .. } => {
                shutdown.cancel();
                Ok(())
            }
        }
    }

    /// Terminate the unit without its cooperation.
    ///
    /// Threads cannot be killed, so an in-process unit is detached instead
    /// and keeps whatever it holds until its run loop returns.
    pub fn force_kill(&mut self) {
        match &mut self.control {
            Control::Process { kill_tx, .. } => {
                if let Some(tx) = kill_tx.take() {
                    let _ = tx.send(());
                }
            }
            Control::Task { thread, .. } => {
                warn!(thread = %thread, "server thread ignored shutdown, detaching it");
            }
        }
    }

    /// How the unit ended, if it has.
    pub fn exit(&self) -> Option<UnitExit> {
        self.exit_rx.borrow().clone()
    }

    /// A receiver that observes the unit's exit.
    pub fn exit_watch(&self) -> watch::Receiver<Option<UnitExit>> {
        self.exit_rx.clone()
    }

    /// Wait at most `timeout` for the unit to end.
    pub async fn wait_exit(&mut self, timeout: Duration) -> Option<UnitExit> {
        tokio::time::timeout(timeout, wait_for_exit(&mut self.exit_rx))
            .await
            .ok()
    }
}

/// Resolves once the watched unit has ended.
pub(crate) async fn wait_for_exit(exit_rx: &mut watch::Receiver<Option<UnitExit>>) -> UnitExit {
    match exit_rx.wait_for(Option::is_some).await {
        Ok(exit) => exit
            .clone()
            .unwrap_or_else(|| UnitExit::failed("exit status unavailable")),
        Err(_) => UnitExit::failed("unit vanished without reporting an exit"),
    }
}
