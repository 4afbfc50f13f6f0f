use crate::config;
use crate::error::{LibraryError, Result};
use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Maximum size per log file before rotation (~5 MB)
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Number of rotated log files to keep
const MAX_LOG_FILES: usize = 5;
const LOG_FILE_STEM: &str = "plexsync";
const MASK: &str = "****";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Defaults to `<data dir>/plexsync/logs`.
    pub log_dir: Option<PathBuf>,
    pub debug: bool,
    /// Values replaced with `****` before any line is written.
    pub secrets: Vec<String>,
}

/// Rotating file logger that also echoes to stderr.
pub struct FileLogger {
    log_dir: PathBuf,
    debug_mode: bool,
    secrets: Vec<String>,
    max_file_size: u64,
    write_lock: Mutex<()>,
}

impl FileLogger {
    pub fn new(options: LogOptions) -> Result<Self> {
        let log_dir = match options.log_dir {
            Some(dir) => dir,
            None => config::data_dir()?.join("logs"),
        };
        fs::create_dir_all(&log_dir)?;
        Ok(Self {
            log_dir,
            debug_mode: options.debug,
            secrets: options
                .secrets
                .into_iter()
                .filter(|secret| !secret.is_empty())
                .collect(),
            max_file_size: MAX_LOG_FILE_SIZE,
            write_lock: Mutex::new(()),
        })
    }

    pub fn log_dir(&self) -> &PathBuf {
        &self.log_dir
    }

    /// The current (active) log file path.
    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir.join(format!("{LOG_FILE_STEM}.log"))
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.log_dir.join(format!("{LOG_FILE_STEM}.{index}.log"))
    }

    pub fn mask(&self, message: &str) -> String {
        self.secrets
            .iter()
            .fold(message.to_string(), |line, secret| line.replace(secret.as_str(), MASK))
    }

    /// Rotate log files: plexsync.log → plexsync.1.log → plexsync.2.log → …
    fn rotate_if_needed(&self) {
        let current = self.current_log_path();
        let file_size = fs::metadata(&current).map(|m| m.len()).unwrap_or(0);
        if file_size < self.max_file_size {
            return;
        }

        for i in (1..MAX_LOG_FILES).rev() {
            let _ = fs::rename(self.rotated_path(i), self.rotated_path(i + 1));
        }
        let _ = fs::rename(&current, self.rotated_path(1));
    }

    /// Append a formatted line to the persistent log file.
    fn write_to_file(&self, line: &str) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.rotate_if_needed();
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.current_log_path())
        {
            let _ = writeln!(file, "{line}");
        }
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() <= Level::Info {
            return true;
        }
        // Dependencies stay at INFO even in debug mode.
        self.debug_mode
            && metadata.level() == Level::Debug
            && metadata.target().starts_with("plexsync")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = self.mask(&record.args().to_string());
        let line = format!(
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            message
        );
        self.write_to_file(&line);
        eprintln!("[{}] {}", record.level(), message);
    }

    fn flush(&self) {}
}

/// Installs the file logger as the global `log` backend and returns the log
/// directory.
pub fn init(options: LogOptions) -> Result<PathBuf> {
    let debug = options.debug;
    let logger = FileLogger::new(options)?;
    let log_dir = logger.log_dir().clone();
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| LibraryError::Config(format!("logger already installed: {e}")))?;
    log::set_max_level(if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    log::info!(
        "=== plexsync session started at {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(log_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger(dir: &std::path::Path) -> FileLogger {
        FileLogger::new(LogOptions {
            log_dir: Some(dir.to_path_buf()),
            debug: false,
            secrets: vec!["s3cret".into(), String::new()],
        })
        .unwrap()
    }

    #[test]
    fn secrets_are_masked() {
        let dir = tempfile::tempdir().unwrap();
        let logger = logger(dir.path());
        assert_eq!(
            logger.mask("GET /identity?X-Plex-Token=s3cret"),
            "GET /identity?X-Plex-Token=****"
        );
        assert_eq!(logger.mask("nothing here"), "nothing here");
    }

    #[test]
    fn full_log_file_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = logger(dir.path());
        logger.max_file_size = 16;

        logger.write_to_file("first line that is long enough");
        logger.write_to_file("second");

        let rotated = fs::read_to_string(dir.path().join("plexsync.1.log")).unwrap();
        let current = fs::read_to_string(dir.path().join("plexsync.log")).unwrap();
        assert!(rotated.contains("first line"));
        assert_eq!(current.trim(), "second");
    }

    #[test]
    fn debug_is_limited_to_this_crate() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = logger(dir.path());
        let ours = Metadata::builder()
            .level(Level::Debug)
            .target("plexsync_lib::library")
            .build();
        let theirs = Metadata::builder().level(Level::Debug).target("ureq").build();

        assert!(!logger.enabled(&ours));
        logger.debug_mode = true;
        assert!(logger.enabled(&ours));
        assert!(!logger.enabled(&theirs));
    }
}
