//! Logging setup for the binary.
//!
//! The library only emits `tracing` events. [`init`] installs a
//! `tracing-subscriber` registry with an [`EnvFilter`](tracing_subscriber::EnvFilter),
//! a pretty or JSON formatter and an optional append-only log file.

mod logging;

pub use logging::build_filter;

use crate::config::{LogFormat, LoggingConfig};
use crate::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Options from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
}

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log
/// file cannot be opened.
pub fn init(config: &LoggingConfig, options: InitOptions) -> Result<()> {
    if LOGGING_INIT.get().is_some() {
        return Err(already_initialized());
    }

    let filter = build_filter(config, options.verbose);

    match (&config.file, config.format) {
        (Some(log_file), LogFormat::Json) => {
            let writer = SharedLog::append(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (Some(log_file), LogFormat::Pretty) => {
            let writer = SharedLog::append(log_file)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
    }

    LOGGING_INIT.set(()).map_err(|()| already_initialized())
}

/// Append-only log file shared by every writer the subscriber makes.
#[derive(Clone)]
struct SharedLog(Arc<Mutex<File>>);

impl SharedLog {
    /// Opens `path` for appending, creating its directory.
    fn append(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create log directory {}", parent.display()), e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::io(format!("open log file {}", path.display()), e))?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        op(&mut file)
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(Write::flush)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLog {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn already_initialized() -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: "logging already initialized".to_string(),
    }
}

#[allow(clippy::needless_pass_by_value)]
fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_is_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("stowage.log");

        let mut writer = SharedLog::append(&path).unwrap();
        writer.write_all(b"first\n").unwrap();
        let mut writer = SharedLog::append(&path).unwrap();
        writer.write_all(b"second\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_poisoned_log_reports_io_error() {
        let dir = TempDir::new().unwrap();
        let mut log = SharedLog::append(&dir.path().join("stowage.log")).unwrap();
        let held = log.clone();
        let _ = std::thread::spawn(move || {
            let _guard = held.0.lock().unwrap();
            panic!("writer died while holding the log");
        })
        .join();

        let err = log.write_all(b"after\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(log.flush().is_err());
    }

    #[test]
    fn test_unwritable_log_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let err = SharedLog::append(&blocker.join("stowage.log")).err().unwrap();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_second_init_fails() {
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            file: Some(dir.path().join("test.log")),
            ..LoggingConfig::default()
        };
        // Another test binary may already own the global subscriber, so only
        // the second call is asserted.
        let _ = init(&config, InitOptions::default());
        let err = init(&config, InitOptions::default()).unwrap_err();
        assert!(matches!(err, Error::OperationFailed { .. }));
    }
}
