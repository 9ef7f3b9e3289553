use crate::{ResourceKind, ServiceFault};

use std::panic::Location;
use std::path::PathBuf;

use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Required {resource} not found at {path} {location}")]
    MissingResource {
        resource: ResourceKind,
        path: PathBuf,
        location: ErrorLocation,
    },

    #[error("Failed to spawn {program}: {source} {location}")]
    ProcessSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Address {addr} is already in use {location}")]
    PortInUse { addr: String, location: ErrorLocation },

    #[error("Failed to spawn server thread: {source} {location}")]
    WorkerSpawn {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Failed to signal pid {pid}: {message} {location}")]
    Signal {
        pid: u32,
        message: String,
        location: ErrorLocation,
    },

    #[error("Cannot locate the running executable: {source} {location}")]
    CurrentExe {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Logging setup failed: {message} {location}")]
    Logging {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO error: {source} {location}")]
    Io {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },
}

impl SupervisorError {
    #[track_caller]
    pub fn missing(resource: ResourceKind, path: impl Into<PathBuf>) -> Self {
        Self::MissingResource {
            resource,
            path: path.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// The fault recorded when this error ends a start attempt.
    pub fn fault(&self) -> ServiceFault {
        match self {
            Self::MissingResource { resource, path, .. } => ServiceFault::MissingResource {
                resource: *resource,
                path: path.clone(),
            },
            Self::ProcessSpawn {
                program, source, ..
            } => ServiceFault::LaunchFailure {
                reason: format!("cannot spawn {}: {source}", program.display()),
            },
            Self::PortInUse { addr, .. } => ServiceFault::LaunchFailure {
                reason: format!("{addr} is already in use"),
            },
            Self::WorkerSpawn { source, .. } => ServiceFault::LaunchFailure {
                reason: format!("cannot spawn server thread: {source}"),
            },
            Self::Signal { pid, message, .. } => ServiceFault::LaunchFailure {
                reason: format!("pid {pid}: {message}"),
            },
            Self::CurrentExe { source, .. } | Self::Io { source, .. } => {
                ServiceFault::LaunchFailure {
                    reason: source.to_string(),
                }
            }
            Self::Logging { message, .. } => ServiceFault::LaunchFailure {
                reason: message.clone(),
            },
        }
    }
}

impl From<std::io::Error> for SupervisorError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type SupervisorResult<T> = std::result::Result<T, SupervisorError>;
