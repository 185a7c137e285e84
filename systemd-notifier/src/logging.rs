//! Logging setup.
//!
//! Console output always, plus an optional daily rotated log file. Timestamps
//! use the local timezone.

use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "systemd_notifier=info,unit_state=info";

/// File name prefix of rotated log files.
const LOG_FILE_PREFIX: &str = "systemd-notifier.log";

#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Build the filter: `RUST_LOG` first, then the configured directive, then the default.
pub fn build_filter(directive: Option<&str>) -> crate::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    match directive {
        Some(d) if !d.trim().is_empty() => EnvFilter::try_new(d)
            .map_err(|e| crate::Error::config(format!("invalid log filter directive: {}", e))),
        _ => Ok(EnvFilter::new(DEFAULT_LOG_FILTER)),
    }
}

/// Initialize the global subscriber.
///
/// Returns the file writer guard when a log directory is configured. Keep it
/// alive for the lifetime of the process so buffered lines get flushed.
pub fn init_logging(
    directive: Option<&str>,
    log_dir: Option<&Path>,
) -> crate::Result<Option<WorkerGuard>> {
    let filter = build_filter(directive)?;

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            crate::Error::Other(format!("Failed to set global default subscriber: {}", e))
        })?;

    Ok(guard)
}
