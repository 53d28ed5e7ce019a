//! Logging initialization.
//!
//! Sets up the tracing subscriber from [`LoggingConfig`]: level filter from
//! the config (overridable with `RUST_LOG`), stdout by default, a
//! non-blocking file appender when a log file is configured.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the global tracing subscriber.
///
/// Returns the worker guard for the non-blocking file writer, if one was
/// set up; keep it alive for the lifetime of the process so buffered log
/// lines are flushed.
///
/// Call once at startup. A second call fails because the global subscriber
/// is already set, which is reported and otherwise ignored.
pub fn init_logging(config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    match config.file.as_deref().filter(|f| !f.is_empty()) {
        Some(file) => {
            let dir = std::path::Path::new(file)
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."));
            let filename = std::path::Path::new(file)
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("kurz.log"));

            let appender = tracing_appender::rolling::never(dir, filename);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let result = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            if let Err(e) = result {
                eprintln!("[WARN] Logging already initialized: {}", e);
            }
            Some(guard)
        }
        None => {
            let result = tracing_subscriber::fmt().with_env_filter(filter).try_init();
            if let Err(e) = result {
                eprintln!("[WARN] Logging already initialized: {}", e);
            }
            None
        }
    }
}
