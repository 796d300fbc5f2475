//! File backend for the `log` facade. The terminal belongs to the game, so records go to a file.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("logger already installed")]
    AlreadyInstalled(#[from] log::SetLoggerError),
}

pub struct FileLogger {
    level: LevelFilter,
    file: Mutex<File>,
}

impl FileLogger {
    pub fn new(file: File, level: LevelFilter) -> Self {
        Self {
            level,
            file: Mutex::new(file),
        }
    }

    fn format(record: &Record) -> String {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        format!(
            "{secs:.3} {:<5} {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", Self::format(record));
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Truncate `path` and route all `log` records at or above `level` into it.
pub fn init(path: &Path, level: LevelFilter) -> Result<(), LogError> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    log::set_boxed_logger(Box::new(FileLogger::new(file, level)))?;
    log::set_max_level(level);
    Ok(())
}
