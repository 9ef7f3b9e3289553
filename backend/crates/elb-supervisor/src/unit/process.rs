//! The managed server as a child process.

use crate::{
    BackingUnit, Launcher, MANAGED_OUTPUT_TARGET, RequiredResource, ResourceKind,
    SupervisorConfig, SupervisorError, SupervisorResult, UnitExit,
};

use std::panic::Location;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

/// Runs `<runtime> <launcher> --model .. --port .. --host .. --n_gpu_layers ..`.
///
/// A crash of the server cannot take the supervisor down with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    fn name(&self) -> &'static str {
        "process"
    }

    fn required_resources(&self, config: &SupervisorConfig) -> Vec<RequiredResource> {
        vec![
            RequiredResource::new(ResourceKind::Runtime, &config.runtime),
            RequiredResource::new(ResourceKind::Launcher, &config.launcher),
            RequiredResource::new(ResourceKind::Model, &config.model),
        ]
    }

    async fn launch(&self, config: &SupervisorConfig) -> SupervisorResult<BackingUnit> {
        let mut cmd = Command::new(&config.runtime);
        cmd.arg(&config.launcher)
            .args(config.server_args())
            .current_dir(config.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        apply_creation_flags(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::ProcessSpawn {
            program: config.runtime.clone(),
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let pid = child.id();

        if let Some(stdout) = child.stdout.take() {
            forward_output(stdout, false);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_output(stderr, true);
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(reap(child, kill_rx, exit_tx));

        Ok(BackingUnit::process(pid, kill_tx, exit_rx))
    }
}

/// Waits for the child and publishes its exit. A kill request (or the unit
/// being dropped) kills the child first.
async fn reap(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<UnitExit>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill_rx => {
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill server process: {e}");
            }
            child.wait().await
        }
    };

    let exit = match status {
        Ok(status) => exit_from_status(status),
        Err(e) => UnitExit::failed(format!("failed to wait for process: {e}")),
    };
    debug!(code = ?exit.code, "server process reaped: {}", exit.detail);
    exit_tx.send_replace(Some(exit));
}

fn exit_from_status(status: ExitStatus) -> UnitExit {
    UnitExit {
        code: status.code(),
        success: status.success(),
        detail: status.to_string(),
    }
}

/// Forward child output line by line so the pipes never fill up.
fn forward_output<R>(reader: R, is_stderr: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if is_stderr {
                warn!(target: MANAGED_OUTPUT_TARGET, "{line}");
            } else {
                info!(target: MANAGED_OUTPUT_TARGET, "{line}");
            }
        }
    });
}

#[cfg(windows)]
fn apply_creation_flags(cmd: &mut Command) {
    use windows_sys::Win32::System::Threading::{CREATE_NEW_PROCESS_GROUP, CREATE_NO_WINDOW};

    cmd.creation_flags(CREATE_NO_WINDOW | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(windows))]
fn apply_creation_flags(_cmd: &mut Command) {}

/// Deliver the cooperative shutdown signal.
#[cfg(unix)]
#[track_caller]
pub(crate) fn signal_graceful(pid: u32) -> SupervisorResult<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| SupervisorError::Signal {
        pid,
        message: String::from("pid out of range"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("Sending SIGTERM to pid {pid}");
    kill(Pid::from_raw(raw), Signal::SIGTERM).map_err(|errno| SupervisorError::Signal {
        pid,
        message: errno.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Deliver the cooperative shutdown signal.
///
/// The child runs in its own process group, so CTRL_BREAK reaches only it.
#[cfg(windows)]
#[track_caller]
pub(crate) fn signal_graceful(pid: u32) -> SupervisorResult<()> {
    use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

    info!("Sending CTRL_BREAK to pid {pid}");
    let delivered = unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) };
    if delivered == 0 {
        return Err(SupervisorError::Signal {
            pid,
            message: std::io::Error::last_os_error().to_string(),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(())
}
