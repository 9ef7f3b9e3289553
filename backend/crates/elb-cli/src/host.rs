//! Config and layout discovery for the CLI host.

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

use std::panic::Location;
use std::path::{Path, PathBuf};

use elb_config::Config;
use elb_supervisor::{BaseKind, ResourceLocator};
use error_location::ErrorLocation;

/// Config directory used when neither the flag nor ELB_CONFIG_DIR is set.
const DEFAULT_CONFIG_DIR: &str = ".elb";

pub(crate) struct HostContext {
    pub config: Config,
    pub config_dir: PathBuf,
    pub locator: ResourceLocator,
}

impl HostContext {
    /// Load and validate config, then settle on a layout.
    pub(crate) fn load(cli: &Cli) -> CliResult<Self> {
        let cwd = std::env::current_dir().map_err(|source| CliError::CurrentDir {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;

        let default_dir = cli
            .config_dir
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_DIR));
        let config_dir = Config::config_dir(&default_dir);
        let config = Config::load(&default_dir)?;
        config.validate()?;

        let exe_dir = ResourceLocator::executable_dir()?;
        let locator = locate(
            requested_kind(cli),
            cli.base_dir.as_deref(),
            &exe_dir,
            &cwd,
            config.runtime.resource_subdir(),
        );

        Ok(Self {
            config,
            config_dir,
            locator,
        })
    }
}

fn requested_kind(cli: &Cli) -> Option<BaseKind> {
    if cli.installed {
        Some(BaseKind::Installed)
    } else if cli.development {
        Some(BaseKind::Development)
    } else {
        None
    }
}

/// Pick base directory and kind.
///
/// An explicit kind wins; otherwise the layout is detected. Installed
/// layouts default to the executable's directory, development layouts to
/// the current directory.
pub(crate) fn locate(
    kind: Option<BaseKind>,
    base_dir: Option<&Path>,
    exe_dir: &Path,
    cwd: &Path,
    resource_subdir: Option<&str>,
) -> ResourceLocator {
    match (kind, base_dir) {
        (Some(kind), Some(base)) => ResourceLocator::new(kind, base, resource_subdir),
        (None, Some(base)) => {
            ResourceLocator::new(BaseKind::detect(base, resource_subdir), base, resource_subdir)
        }
        (Some(BaseKind::Installed), None) => {
            ResourceLocator::new(BaseKind::Installed, exe_dir, resource_subdir)
        }
        (Some(BaseKind::Development), None) => {
            ResourceLocator::new(BaseKind::Development, cwd, resource_subdir)
        }
        (None, None) => match BaseKind::detect(exe_dir, resource_subdir) {
            BaseKind::Installed => ResourceLocator::new(BaseKind::Installed, exe_dir, resource_subdir),
            BaseKind::Development => {
                ResourceLocator::new(BaseKind::Development, cwd, resource_subdir)
            }
        },
    }
}
