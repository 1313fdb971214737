use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Keeps the non-blocking file writer flushing; hold it until shutdown
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber: stdout always, plus a daily-rotated file
/// under `log_dir` when file logs are enabled. A second call leaves the
/// first subscriber in place.
pub fn init_tracing(config: &Config) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match file_writer(config) {
        Some((writer, guard)) => {
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init();
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }

    guard
}

fn file_writer(config: &Config) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if !config.file_logs {
        return None;
    }
    if let Err(err) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("failed to create log directory {}: {err}", config.log_dir);
        return None;
    }
    let appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &config.log_file);
    Some(tracing_appender::non_blocking(appender))
}
