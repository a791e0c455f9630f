//! Utility functions for the classification service.
//!
//! This module provides image decoding and tensor conversion helpers, and the
//! logging setup.

pub mod image;

pub use image::{channel_count, decode_image_bytes, image_to_tensor};

use crate::core::config::ExecutionMode;
use crate::core::constants::{LOG_FILE_PREFIX, MAX_LOG_FILES};
use crate::core::errors::{ClassifyError, ClassifyResult};
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Opens a daily rolling `api.<date>.log` file in `dir`, creating the
/// directory when missing.
///
/// Lines are written from a background thread; they are flushed when the
/// returned guard is dropped.
pub fn file_log_writer(dir: &Path) -> ClassifyResult<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| {
            ClassifyError::config_error_with_context(
                "log_dir",
                &dir.display().to_string(),
                &format!("failed to open log file: {}", e),
            )
        })?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence when set. Otherwise the level follows the
/// execution mode: `debug` in development, `info` in production. Events go to
/// stdout and, when `log_dir` is set, to a rolling file in that directory.
///
/// The returned guard must be held for as long as the process logs.
pub fn init_tracing(
    mode: ExecutionMode,
    log_dir: Option<&Path>,
) -> ClassifyResult<Option<WorkerGuard>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = file_log_writer(dir)?;
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(mode.log_level()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true)
                .with_writer(writer)
        }))
        .init();

    Ok(guard)
}
