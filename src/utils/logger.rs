// Logger initialization

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "alt_history=debug,tower_http=debug,axum=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Log to stdout. Used by the web server and one-shot modes.
pub fn init_stdout_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log to a daily-rotated file under `dir`, keeping the terminal free for the TUI.
///
/// The returned guard flushes buffered lines on drop and must outlive the app.
pub fn init_file_logging(dir: &Path) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir, "alt-history.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();

    guard
}
