//! Port availability checking.

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;

use error_location::ErrorLocation;

/// Check if `host:port` can be bound.
///
/// The probe socket is released as soon as the listener is dropped.
pub fn is_available(host: &str, port: u16) -> bool {
    std::net::TcpListener::bind((host, port)).is_ok()
}

/// Fail with `PortInUse` unless `host:port` can be bound.
#[track_caller]
pub fn ensure_available(host: &str, port: u16) -> SupervisorResult<()> {
    if is_available(host, port) {
        return Ok(());
    }

    let addr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    Err(SupervisorError::PortInUse {
        addr,
        location: ErrorLocation::from(Location::caller()),
    })
}
