//! Path resolution for development and installed layouts.

use crate::{SupervisorError, SupervisorResult};

use std::panic::Location;
use std::path::{Path, PathBuf};

use elb_config::{LoggingConfig, ModelConfig, RuntimeConfig};
use error_location::ErrorLocation;

/// Where the program's files live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseKind {
    /// Base is the source root; assets sit directly under it
    Development,
    /// Base is the directory of the running executable; assets sit in the
    /// bundle's resource subdirectory
    Installed,
}

impl BaseKind {
    /// Installed when the bundle's resource subdirectory sits next to the executable.
    pub fn detect(exe_dir: &Path, resource_subdir: Option<&str>) -> Self {
        match resource_subdir {
            Some(subdir) if exe_dir.join(subdir).is_dir() => Self::Installed,
            _ => Self::Development,
        }
    }
}

/// Resolves every runtime asset against one base.
///
/// Resolution never touches the file system; existence is checked by the
/// supervisor's preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    kind: BaseKind,
    base_dir: PathBuf,
    resource_subdir: Option<PathBuf>,
}

impl ResourceLocator {
    pub fn new(kind: BaseKind, base_dir: impl Into<PathBuf>, resource_subdir: Option<&str>) -> Self {
        Self {
            kind,
            base_dir: base_dir.into(),
            resource_subdir: resource_subdir.map(PathBuf::from),
        }
    }

    /// Directory of the running executable, the installed base.
    #[track_caller]
    pub fn executable_dir() -> SupervisorResult<PathBuf> {
        let exe = std::env::current_exe().map_err(|source| SupervisorError::CurrentExe {
            source,
            location: ErrorLocation::from(Location::caller()),
        })?;
        Ok(exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")))
    }

    pub fn kind(&self) -> BaseKind {
        self.kind
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory every runtime asset is resolved against.
    pub fn resource_root(&self) -> PathBuf {
        match (self.kind, &self.resource_subdir) {
            (BaseKind::Installed, Some(subdir)) => self.base_dir.join(subdir),
            _ => self.base_dir.clone(),
        }
    }

    /// Absolute path of a runtime asset.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.resource_root().join(relative)
    }

    pub fn runtime_binary(&self, runtime: &RuntimeConfig) -> PathBuf {
        self.resolve(&runtime.binary)
    }

    pub fn launcher_script(&self, runtime: &RuntimeConfig) -> PathBuf {
        self.resolve(&runtime.launcher)
    }

    pub fn model_file(&self, model: &ModelConfig) -> PathBuf {
        self.resolve(&model.file)
    }

    /// Home of the bundled runtime's standard library, only when installed.
    pub fn runtime_home(&self) -> Option<PathBuf> {
        match self.kind {
            BaseKind::Installed => Some(self.resource_root()),
            BaseKind::Development => None,
        }
    }

    /// Logs stay beside the executable, outside the resource subdirectory.
    pub fn log_dir(&self, logging: &LoggingConfig) -> PathBuf {
        self.base_dir.join(&logging.dir)
    }
}
