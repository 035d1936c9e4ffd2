use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter, e.g. `debug` or `mediasort=trace`.
pub const LOG_FILTER_ENV: &str = "MEDIASORT_LOG";

fn log_file_stem(started: DateTime<Local>) -> String {
    format!("mediasort-{}", started.format("%Y-%m-%d_%H-%M-%S"))
}

/// Set up the per-run log file in `log_dir` and return its path.
///
/// Every decision goes to the file. With `verbose` the same events are echoed to stderr.
pub fn init_logging(log_dir: &Path, verbose: bool) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let stem = log_file_stem(Local::now());
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&stem)
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to open log file")?;

    let filter = env::var(LOG_FILTER_ENV).unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(false),
        )
        .with(verbose.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_target(false)
        }))
        .with(EnvFilter::new(filter))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(log_dir.join(format!("{stem}.log")))
}
