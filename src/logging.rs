//! Console and log-file output for the `tcpline` binary
//!
//! Library components only emit `tracing` events; the subscriber built here
//! is installed once, by the binary.

use std::io;
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOG_DIR: &str = "tcpline";
const LOG_FILE: &str = "tcpline.log";

/// `<tmp>/tcpline/tcpline.log`
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join(LOG_DIR).join(LOG_FILE)
}

/// Level filter: `RUST_LOG` when set, otherwise info (debug when verbose)
fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "tcpline=debug" } else { "tcpline=info" })
    })
}

/// Builds a subscriber writing to stderr and to `file`
pub fn subscriber(verbose: bool, file: NonBlocking) -> impl Subscriber + Send + Sync {
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    let log_file = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(file);

    tracing_subscriber::registry()
        .with(filter(verbose))
        .with(console)
        .with(log_file)
}

/// Opens `path` for appending behind a background writer
///
/// Records are flushed while the returned guard is alive and once more when
/// it drops.
pub fn file_writer(path: &Path) -> io::Result<(NonBlocking, WorkerGuard)> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name"))?;
    std::fs::create_dir_all(directory)?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber; keep the guard until exit
pub fn init(verbose: bool, path: &Path) -> io::Result<WorkerGuard> {
    let (file, guard) = file_writer(path)?;
    subscriber(verbose, file).try_init().map_err(io::Error::other)?;
    Ok(guard)
}
