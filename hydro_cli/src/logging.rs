//! tracing-subscriber setup: console on stderr, optional JSON-lines file.

use std::path::Path;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::FILE_GUARD;

/// Install the global subscriber.
///
/// Stdout stays free for telemetry and command output, so console logs go
/// to stderr. `logging` is `None` when the config failed to load; only the
/// console sink is installed then.
pub fn init_tracing(json: bool, level: &str, logging: Option<&hydro_config::Logging>) {
    let console_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let (pretty, json_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter());
        (None, Some(layer))
    } else {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter());
        (Some(layer), None)
    };

    let file_layer = logging.and_then(|l| {
        let path = Path::new(l.file.as_deref()?);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path.file_name()?;
        let appender = match l.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = l
            .level
            .as_deref()
            .and_then(|s| s.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::INFO);
        Some(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_level),
        )
    });

    // A second init (tests, repeated calls) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(pretty)
        .with(json_layer)
        .with(file_layer)
        .try_init();
}
