use std::panic::Location;

use elb_config::ConfigError;
use elb_supervisor::SupervisorError;
use error_location::ErrorLocation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{source} {location}")]
    Config {
        #[source]
        source: ConfigError,
        location: ErrorLocation,
    },

    #[error("{source} {location}")]
    Supervisor {
        #[source]
        source: SupervisorError,
        location: ErrorLocation,
    },

    #[error("Cannot determine the current directory: {source} {location}")]
    CurrentDir {
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for CliError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        Self::Config {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<SupervisorError> for CliError {
    #[track_caller]
    fn from(source: SupervisorError) -> Self {
        Self::Supervisor {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type CliResult<T> = std::result::Result<T, CliError>;
