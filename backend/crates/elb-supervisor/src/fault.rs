use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A file the backing unit cannot run without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Runtime,
    Launcher,
    Model,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Runtime => "runtime",
            Self::Launcher => "launcher",
            Self::Model => "model",
        };
        f.write_str(name)
    }
}

/// Why the last attempt did not end the way it was asked to.
///
/// This is what `last_error` holds. Unlike [`crate::SupervisorError`] it is
/// cheap to clone and compare, so it can travel inside state snapshots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceFault {
    #[error("missing {resource} at {path}")]
    MissingResource { resource: ResourceKind, path: PathBuf },

    #[error("launch failed: {reason}")]
    LaunchFailure { reason: String },

    #[error("server exited unexpectedly ({detail})")]
    UnexpectedTermination { code: Option<i32>, detail: String },

    #[error("graceful stop exceeded {grace_ms}ms, server was killed")]
    ShutdownTimeout { grace_ms: u64 },
}

impl ServiceFault {
    /// Short label for menus and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingResource { .. } => "missing resource",
            Self::LaunchFailure { .. } => "launch failure",
            Self::UnexpectedTermination { .. } => "unexpected exit",
            Self::ShutdownTimeout { .. } => "shutdown timeout",
        }
    }

    /// Whether the attempt that recorded this fault ended in `Failed`.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::ShutdownTimeout { .. })
    }
}
