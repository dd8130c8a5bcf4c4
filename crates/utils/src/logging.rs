//! provides logging helpers

use std::path::Path;

use anyhow::Context;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

fn env_filter() -> filter::EnvFilter {
    filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy()
}

/// Human readable stderr layer, filtered by `RUST_LOG` (defaults to `info`).
pub fn get_fmt_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter())
}

/// initiate the global tracing subscriber
///
/// When `log_file` is given, events are additionally written to it as JSON
/// lines through a non-blocking daily rolling appender. The returned guard
/// must be held until the process exits so buffered lines are flushed.
pub fn init<P: AsRef<Path>>(log_file: Option<P>) -> anyhow::Result<Option<WorkerGuard>> {
    let Some(log_file) = log_file else {
        registry().with(get_fmt_layer()).init();
        return Ok(None);
    };

    let log_file = log_file.as_ref();
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let prefix = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid log file name: {}", log_file.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(3)
        .build(dir)
        .context("failed to create rolling file appender")?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(appender);

    let file_layer = layer()
        .json()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(env_filter());

    registry().with(get_fmt_layer()).with(file_layer).init();
    Ok(Some(file_guard))
}
