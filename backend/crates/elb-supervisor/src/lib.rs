//! Lifecycle supervision for the local inference server.
//!
//! [`ResourceLocator`] turns configured names into absolute paths for either
//! the source tree or an installed bundle. [`ServiceSupervisor`] owns the one
//! backing unit (child process or in-process task) and is the only writer of
//! its state; hosts observe it through [`ServiceSupervisor::subscribe`].

mod config;
mod error;
mod fault;
mod menu;
mod port;
mod preflight;
mod readiness;
mod resource;
mod state;
mod supervisor;
mod unit;

pub mod logging;

#[cfg(test)]
mod tests;

pub use config::{ReadinessSettings, ServerSpec, SupervisorConfig};
pub use error::{SupervisorError, SupervisorResult};
pub use fault::{ResourceKind, ServiceFault};
pub use menu::MenuModel;
pub use port::{ensure_available, is_available};
pub use preflight::preflight;
pub use resource::{BaseKind, ResourceLocator};
pub use state::{ServiceState, StateSnapshot, StopOutcome};
pub use supervisor::ServiceSupervisor;
pub use unit::{
    BackingUnit, InProcessLauncher, InProcessServer, Launcher, ProcessLauncher, RequiredResource,
    ServeError, UnitExit,
};

use std::time::Duration;

/// Interval between readiness polls.
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Per-request timeout of a readiness poll.
const READINESS_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
/// Thread name of the in-process server worker.
const IN_PROCESS_THREAD_NAME: &str = "elb-inference-server";
/// `tracing` target of forwarded child output.
const MANAGED_OUTPUT_TARGET: &str = "managed_server";
