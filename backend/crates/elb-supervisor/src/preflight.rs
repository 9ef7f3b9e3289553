use crate::{Launcher, SupervisorConfig, SupervisorError, SupervisorResult};

use tracing::debug;

/// Check that every file the launcher needs exists.
///
/// Runs before any process or socket is touched. The first missing file
/// is reported.
pub fn preflight(launcher: &dyn Launcher, config: &SupervisorConfig) -> SupervisorResult<()> {
    for required in launcher.required_resources(config) {
        if !required.path.is_file() {
            return Err(SupervisorError::missing(required.kind, required.path));
        }
        debug!("preflight ok: {} at {}", required.kind, required.path.display());
    }
    Ok(())
}
