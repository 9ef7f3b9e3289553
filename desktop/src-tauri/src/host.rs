//! Where the tray finds its config, bundle and logs.

use std::path::Path;

use elb_supervisor::{BaseKind, ResourceLocator};

/// Debug builds run from a source checkout (the current directory);
/// release builds run from the bundle's resource directory.
pub(crate) fn locate(
    development: bool,
    cwd: &Path,
    resource_dir: &Path,
    resource_subdir: Option<&str>,
) -> ResourceLocator {
    if development {
        ResourceLocator::new(BaseKind::Development, cwd, resource_subdir)
    } else {
        ResourceLocator::new(BaseKind::Installed, resource_dir, resource_subdir)
    }
}
