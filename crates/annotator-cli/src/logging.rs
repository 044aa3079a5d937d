//! Tracing subscriber setup.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, LogRotation, LoggingConfig};

/// Installs the global subscriber.
///
/// Output goes to standard output, or to a rolling `logging.file` written
/// from a background thread. The returned guard flushes that thread on drop
/// and must live until the process exits.
///
/// # Errors
///
/// Returns [`ConfigError::LogFileName`] or [`ConfigError::LogFile`] if the
/// log file cannot be set up.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (writer, ansi, guard) = match &config.file {
        Some(path) => {
            let appender = file_appender(path, config.rotation, config.max_files)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), false, Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), true, None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(guard)
}

/// Builds the rolling appender for `path`.
///
/// The file name is the prefix of every rolled file; rolled files get a date
/// suffix unless rotation is `never`. At most `max_files` are kept.
pub fn file_appender(
    path: &str,
    rotation: LogRotation,
    max_files: usize,
) -> Result<RollingFileAppender, ConfigError> {
    let path_ref = Path::new(path);
    let prefix = path_ref
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ConfigError::LogFileName(path.to_string()))?;
    let dir = match path_ref.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let rotation = match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|source| ConfigError::LogFile {
            path: path.to_string(),
            source,
        })
}
