//! Tracing setup: JSON lines to a log file, warnings to stderr

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Installs the global subscriber. The returned guard flushes the log file
/// on drop and must live until the process exits.
pub fn init(log_path: &Path, verbose: bool) -> anyhow::Result<WorkerGuard> {
    let log_dir = log_path
        .parent()
        .context("log path has no parent directory")?;
    let file_name = log_path
        .file_name()
        .context("log path has no file name")?;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create {}", log_dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        log_dir, file_name,
    ));

    let file_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
