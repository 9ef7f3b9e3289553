use crate::ServiceFault;

use std::fmt;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ServiceState {
    /// `start()` launches only from these states.
    pub fn accepts_start(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What observers see after every transition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateSnapshot {
    pub state: ServiceState,
    pub last_error: Option<ServiceFault>,
    /// Set on entering `Running`
    pub started_at: Option<DateTime<Utc>>,
    /// `pid=<n>` or `thread=<name>` of the live unit
    pub unit: Option<String>,
    /// The server answered its readiness probe
    pub ready: bool,
    /// Number of accepted start requests so far
    pub attempt: u64,
}

/// How a `stop()` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was running
    NotRunning,
    /// The unit exited within the grace window
    Graceful,
    /// The grace window passed and the unit was killed
    Forced,
}
