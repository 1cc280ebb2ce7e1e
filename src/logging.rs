//! Tracing subscriber setup: stdout plus an optional daily-rolling log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.default_filter`. The returned guard must be
/// held for the life of the process when file logging is enabled, otherwise
/// buffered lines are dropped on exit.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let (file_writer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "masjid_saas.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => {
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
            });
            registry
                .with(fmt::layer().json())
                .with(file_layer)
                .try_init()?;
        }
        LogFormat::Pretty => {
            let file_layer =
                file_writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer));
            registry
                .with(fmt::layer().with_target(true))
                .with(file_layer)
                .try_init()?;
        }
    }

    Ok(guard)
}
