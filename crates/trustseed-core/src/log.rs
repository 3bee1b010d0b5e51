//! Logging system for trustseed.
//!
//! Structured logging goes through `tracing`. Console output is filtered by
//! `TRUSTSEED_LOG` (falling back to `RUST_LOG`) or the verbosity flags; an
//! optional log file always receives debug-level detail.

use std::path::Path;
use trustseed_types::{LogLevel, Result, SetupError};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "TRUSTSEED_LOG";

/// Initialize the logging system.
///
/// The returned guard flushes the log file on drop and must be held for the
/// lifetime of the process.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console_filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(level)));

    let console = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(EnvFilter::new(default_directive(LogLevel::Debug)));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| SetupError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(guard)
}

fn default_directive(level: LogLevel) -> String {
    format!("trustseed={level},trustseed_core={level},trustseed_secrets={level},trustseed_pki={level},trustseed_components={level}",
        level = level.as_directive())
}

fn file_writer(path: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| SetupError::Config(format!("Log file path has no file name: {}", path.display())))?;

    std::fs::create_dir_all(directory)?;
    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_all_crates() {
        let directive = default_directive(LogLevel::Debug);
        assert!(directive.contains("trustseed=debug"));
        assert!(directive.contains("trustseed_pki=debug"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
