//! Logging and tracing initialization.

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// When `config.file` is set, output goes to that file (appended) instead of
/// stderr. Calling this twice is harmless; the second subscriber is dropped.
pub fn init_logging(config: &LoggingConfig) {
    use std::sync::Mutex;
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file = config.file.as_ref().and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("Failed to open log file {}: {e}", path.display()))
            .ok()
    });

    let builder = fmt::Subscriber::builder().with_env_filter(env_filter);

    match (config.json, file) {
        (true, Some(file)) => {
            let subscriber = builder.json().with_writer(Mutex::new(file)).finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (true, None) => {
            let subscriber = builder.json().with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, Some(file)) => {
            let subscriber = builder
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (false, None) => {
            let subscriber = builder
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}
