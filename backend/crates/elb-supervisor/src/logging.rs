//! Logging setup with file rotation.

use crate::{SupervisorError, SupervisorResult};

use std::path::Path;

use elb_config::LoggingConfig;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Install the global subscriber: console plus a daily rotating file in `log_dir`.
///
/// `RUST_LOG` wins over the configured level. Records emitted through `log`
/// are picked up as well.
pub fn init(config: &LoggingConfig, log_dir: &Path) -> SupervisorResult<()> {
    std::fs::create_dir_all(log_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(config.colored);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(config.retention_days)
        .filename_prefix(config.file_prefix.as_str())
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| SupervisorError::logging(e.to_string()))?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SupervisorError::logging(e.to_string()))
}
