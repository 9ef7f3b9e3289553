//! Server lifecycle state machine.

use crate::readiness::{probe_url, wait_ready};
use crate::unit::wait_for_exit;
use crate::{
    BackingUnit, Launcher, ProcessLauncher, ReadinessSettings, ServiceFault, ServiceState,
    StateSnapshot, StopOutcome, SupervisorConfig, SupervisorResult, UnitExit, port, preflight,
};

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Owns the single backing unit and every transition of its state.
///
/// Start and stop requests, unexpected exits and readiness updates all go
/// through one async mutex, so they never interleave. A `stop()` issued
/// while a launch is in flight waits for the launch outcome. The only
/// waits taken under the lock while a unit is up are the two bounded
/// grace windows of `stop()`.
///
/// Cloning is cheap; clones share the same unit.
#[derive(Clone)]
pub struct ServiceSupervisor {
    shared: Arc<Shared>,
}

struct Shared {
    config: Arc<SupervisorConfig>,
    launcher: Arc<dyn Launcher>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<StateSnapshot>,
}

#[derive(Default)]
struct Inner {
    snapshot: StateSnapshot,
    unit: Option<BackingUnit>,
    /// Cancelled when the current attempt ends; stops its exit monitor and
    /// readiness probe
    attempt_token: Option<CancellationToken>,
    /// Exit watch of a unit that outlived its forced stop. No new unit is
    /// launched until it reports an exit.
    lingering: Option<watch::Receiver<Option<UnitExit>>>,
}

impl ServiceSupervisor {
    /// Supervisor that runs the server as a child process.
    pub fn new(config: Arc<SupervisorConfig>) -> Self {
        Self::with_launcher(config, Arc::new(ProcessLauncher))
    }

    pub fn with_launcher(config: Arc<SupervisorConfig>, launcher: Arc<dyn Launcher>) -> Self {
        let (state_tx, _) = watch::channel(StateSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                config,
                launcher,
                inner: Mutex::new(Inner::default()),
                state_tx,
            }),
        }
    }

    /// The latest published snapshot.
    pub fn current_state(&self) -> StateSnapshot {
        self.shared.state_tx.borrow().clone()
    }

    /// Receive a snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.shared.state_tx.subscribe()
    }

    /// Check the launcher's required files without starting anything.
    pub fn preflight(&self) -> SupervisorResult<()> {
        preflight(self.shared.launcher.as_ref(), &self.shared.config)
    }

    /// Start the server unless it is already up.
    ///
    /// Failures are recorded in the returned snapshot's `last_error`, never
    /// raised; a later `start()` retries.
    pub async fn start(&self) -> StateSnapshot {
        let mut inner = self.shared.inner.lock().await;
        let config = &self.shared.config;

        if !inner.snapshot.state.accepts_start() {
            info!(
                attempt = inner.snapshot.attempt,
                "start requested while {}, ignoring", inner.snapshot.state
            );
            return inner.snapshot.clone();
        }

        inner.snapshot.attempt += 1;
        inner.snapshot.last_error = None;
        inner.snapshot.started_at = None;
        inner.snapshot.unit = None;
        inner.snapshot.ready = false;
        let attempt = inner.snapshot.attempt;
        info!(
            attempt,
            launcher = self.shared.launcher.name(),
            "start requested"
        );

        let lingering = inner.lingering.as_ref().map(|rx| rx.borrow().is_none());
        match lingering {
            Some(true) => {
                warn!(attempt, "previous server still running, refusing to launch another");
                self.fail(
                    &mut inner,
                    ServiceFault::LaunchFailure {
                        reason: String::from("previous server thread still running"),
                    },
                );
                return inner.snapshot.clone();
            }
            Some(false) => inner.lingering = None,
            None => {}
        }

        if let Err(e) = self.preflight() {
            let fault = e.fault();
            if let ServiceFault::MissingResource { resource, path } = &fault {
                warn!(
                    attempt,
                    %resource,
                    path = %path.display(),
                    "preflight failed: {resource}"
                );
            }
            self.fail(&mut inner, fault);
            return inner.snapshot.clone();
        }

        self.transition(&mut inner, ServiceState::Starting);

        if let Err(e) = port::ensure_available(&config.host, config.port) {
            error!(attempt, "Cannot launch server: {e}");
            self.fail(&mut inner, e.fault());
            return inner.snapshot.clone();
        }

        let mut unit = match self.shared.launcher.launch(config).await {
            Ok(unit) => unit,
            Err(e) => {
                error!(attempt, "Server launch failed: {e}");
                self.fail(&mut inner, e.fault());
                return inner.snapshot.clone();
            }
        };

        let described = unit.describe();
        info!(attempt, unit = %described, "launched {described}");

        let token = CancellationToken::new();
        inner.snapshot.started_at = Some(Utc::now());
        inner.snapshot.unit = Some(described);
        self.transition(&mut inner, ServiceState::Running);

        unit.activate();
        self.spawn_exit_monitor(unit.exit_watch(), attempt, token.clone());
        if let Some(settings) = &config.readiness {
            self.spawn_readiness_probe(settings.clone(), attempt, token.clone());
        }

        inner.unit = Some(unit);
        inner.attempt_token = Some(token);
        inner.snapshot.clone()
    }

    /// Stop the server if it is running.
    ///
    /// Waits at most one grace window for a cooperative exit, then kills the
    /// unit and waits at most one more window for the kill to land. Either
    /// way the state ends `Stopped`. A unit that survives the kill (a thread
    /// that ignores its token) blocks new launches until it exits.
    pub async fn stop(&self) -> StopOutcome {
        let mut inner = self.shared.inner.lock().await;

        if inner.snapshot.state != ServiceState::Running {
            info!("stop requested while {}, ignoring", inner.snapshot.state);
            return StopOutcome::NotRunning;
        }

        if let Some(token) = inner.attempt_token.take() {
            token.cancel();
        }

        let Some(mut unit) = inner.unit.take() else {
            self.mark_stopped(&mut inner);
            return StopOutcome::NotRunning;
        };

        let config = &self.shared.config;
        let grace_ms = config.grace_ms();
        let described = unit.describe();
        self.transition(&mut inner, ServiceState::Stopping);
        info!(unit = %described, grace_ms, "graceful stop requested");

        if let Err(e) = unit.request_shutdown() {
            warn!(unit = %described, "Cooperative shutdown not delivered: {e}");
        }

        let outcome = match unit.wait_exit(config.grace_timeout).await {
            Some(exit) => {
                debug!(unit = %described, "exited within grace window: {}", exit.detail);
                StopOutcome::Graceful
            }
            None => {
                warn!(unit = %described, grace_ms, "forced kill after {grace_ms}ms");
                unit.force_kill();
                if unit.wait_exit(config.grace_timeout).await.is_none() {
                    warn!(unit = %described, "no exit acknowledged after forced kill");
                    inner.lingering = Some(unit.exit_watch());
                }
                inner.snapshot.last_error = Some(ServiceFault::ShutdownTimeout { grace_ms });
                StopOutcome::Forced
            }
        };

        drop(unit);
        self.mark_stopped(&mut inner);
        info!(unit = %described, outcome = ?outcome, "stopped");
        outcome
    }

    /// Exit hook of the hosting process; returns once nothing is left running.
    pub async fn on_process_exit(&self) -> StopOutcome {
        info!("host exiting, stopping server");
        self.stop().await
    }

    fn spawn_exit_monitor(
        &self,
        mut exit_rx: watch::Receiver<Option<UnitExit>>,
        attempt: u64,
        token: CancellationToken,
    ) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let exit = tokio::select! {
                _ = token.cancelled() => return,
                exit = wait_for_exit(&mut exit_rx) => exit,
            };
            supervisor.handle_unit_exit(attempt, exit).await;
        });
    }

    async fn handle_unit_exit(&self, attempt: u64, exit: UnitExit) {
        let mut inner = self.shared.inner.lock().await;

        if inner.snapshot.attempt != attempt || inner.snapshot.state != ServiceState::Running {
            debug!(attempt, "exit of a unit no longer running, ignoring");
            return;
        }

        let described = inner.snapshot.unit.clone().unwrap_or_default();
        error!(
            attempt,
            unit = %described,
            code = ?exit.code,
            "unexpected exit: {}", exit.detail
        );

        if let Some(token) = inner.attempt_token.take() {
            token.cancel();
        }
        inner.unit = None;
        inner.snapshot.started_at = None;
        inner.snapshot.unit = None;
        inner.snapshot.ready = false;
        self.fail(
            &mut inner,
            ServiceFault::UnexpectedTermination {
                code: exit.code,
                detail: exit.detail,
            },
        );
    }

    fn spawn_readiness_probe(
        &self,
        settings: ReadinessSettings,
        attempt: u64,
        token: CancellationToken,
    ) {
        let supervisor = self.clone();
        let url = probe_url(&self.shared.config.server_spec(), &settings);
        tokio::spawn(async move {
            debug!(attempt, "polling {url} for readiness");
            let ready = tokio::select! {
                _ = token.cancelled() => return,
                ready = wait_ready(&url, &settings) => ready,
            };

            if ready {
                supervisor.mark_ready(attempt).await;
            } else {
                warn!(
                    attempt,
                    "server did not answer {url} within {}s",
                    settings.timeout.as_secs()
                );
            }
        });
    }

    async fn mark_ready(&self, attempt: u64) {
        let mut inner = self.shared.inner.lock().await;
        if inner.snapshot.attempt == attempt && inner.snapshot.state == ServiceState::Running {
            inner.snapshot.ready = true;
            info!(attempt, "server ready");
            self.publish(&inner);
        }
    }

    fn mark_stopped(&self, inner: &mut MutexGuard<'_, Inner>) {
        inner.snapshot.started_at = None;
        inner.snapshot.unit = None;
        inner.snapshot.ready = false;
        self.transition(inner, ServiceState::Stopped);
    }

    fn fail(&self, inner: &mut MutexGuard<'_, Inner>, fault: ServiceFault) {
        inner.snapshot.last_error = Some(fault);
        self.transition(inner, ServiceState::Failed);
    }

    fn transition(&self, inner: &mut MutexGuard<'_, Inner>, state: ServiceState) {
        debug!(from = %inner.snapshot.state, to = %state, "state transition");
        inner.snapshot.state = state;
        self.publish(inner);
    }

    fn publish(&self, inner: &Inner) {
        self.shared.state_tx.send_replace(inner.snapshot.clone());
    }
}
