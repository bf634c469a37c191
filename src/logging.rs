//! Logging setup driven by the resolved [`LogConfig`].
//!
//! Output goes either to stdout or to an append-only log file. The returned
//! [`LogHandle`] is what the orchestrator flushes when it releases logging
//! resources during shutdown.
use std::{
    fs::{self, File, OpenOptions},
    io::{self, LineWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogType};
use crate::error::ClientError;

/// Line-buffered log file shared between the subscriber and the [`LogHandle`].
#[derive(Clone)]
struct SharedLogFile(Arc<Mutex<LineWriter<File>>>);

impl Write for SharedLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .flush()
    }
}

/// Handle to the active log sink.
#[derive(Clone, Default)]
pub struct LogHandle {
    file: Option<SharedLogFile>,
}

impl LogHandle {
    /// Flushes buffered log output.
    pub fn flush(&self) {
        if let Some(file) = &self.file {
            let mut file = file.clone();
            if let Err(err) = file.flush() {
                eprintln!("failed to flush log file: {err}");
            }
        }
        if let Err(err) = io::stdout().flush() {
            eprintln!("failed to flush stdout: {err}");
        }
    }
}

fn open_log_file(path: &Path) -> Result<SharedLogFile, ClientError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(SharedLogFile(Arc::new(Mutex::new(LineWriter::new(file)))))
}

/// Installs the global `tracing` subscriber for the resolved log settings.
pub fn init_logging(config: &LogConfig) -> Result<LogHandle, ClientError> {
    let filter = EnvFilter::new(config.level.as_ref());

    match config.log_type {
        LogType::Stdout => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|err| ClientError::Logging(err.to_string()))?;
            Ok(LogHandle::default())
        }
        LogType::File => {
            let file = open_log_file(&config.file)?;
            let writer = file.clone();
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .try_init()
                .map_err(|err| ClientError::Logging(err.to_string()))?;
            Ok(LogHandle { file: Some(file) })
        }
    }
}

/// Stdout logging used when the configuration could not be resolved.
pub fn init_fallback_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
