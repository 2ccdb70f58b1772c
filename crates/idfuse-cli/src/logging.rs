use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Console gets a compact, target-free view; the full record goes to a
/// daily-rolled file. Filter via IDFUSE_LOG, file location via
/// IDFUSE_LOG_DIR.
pub fn init_logger() -> impl Drop {
    let filter = EnvFilter::new(env::var("IDFUSE_LOG").unwrap_or_else(|_| "info".to_string()));
    let log_dir = env::var("IDFUSE_LOG_DIR").unwrap_or_else(|_| "logs".to_string());

    let file_appender = tracing_appender::rolling::daily(log_dir, "idfuse.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time(),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .init();

    guard
}
