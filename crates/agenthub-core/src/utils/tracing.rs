//! Logging setup shared by every front end.
//!
//! The filter comes from `RUST_LOG` when set. With a log file, output goes
//! through a non-blocking writer so it never interleaves with streamed chat
//! text on stdout; the returned guard must be kept alive to flush it.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

pub const DEFAULT_FILTER: &str = "agenthub=info,agenthub_core=info";

pub fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| Error::Configuration(format!("Failed to initialise tracing: {e}")))?;
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| {
        Error::Configuration(format!(
            "Log file path has no file name: {}",
            path.display()
        ))
    })?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::Configuration(format!("Failed to initialise tracing: {e}")))?;

    Ok(Some(guard))
}
