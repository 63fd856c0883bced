//! Tracing setup: human-readable lines on stderr plus, when a log directory
//! is given, a daily file `hospital_system_YYYYMMDD.log`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::helpers;

pub fn log_file_name(date: NaiveDate) -> String {
    format!("hospital_system_{}.log", date.format("%Y%m%d"))
}

/// Open today's log file for appending, creating the directory if needed.
pub fn open_log_file(dir: &Path) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(helpers::current_date()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()))
}

fn init_stderr_only() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Install the global subscriber. Returns the log file in use, if any.
///
/// A second call is a no-op: the first subscriber stays installed.
pub fn init_logging(log_dir: Option<&Path>) -> Option<PathBuf> {
    match log_dir.map(open_log_file) {
        Some(Ok((path, file))) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr.and(Mutex::new(file)))
                .with_ansi(false)
                .try_init();
            Some(path)
        }
        Some(Err(e)) => {
            init_stderr_only();
            tracing::warn!(error = %e, "Log file unavailable, logging to stderr only");
            None
        }
        None => {
            init_stderr_only();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_compact_date() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(log_file_name(d), "hospital_system_20250105.log");
    }

    #[test]
    fn log_file_created_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs");
        let (path, _file) = open_log_file(&nested).unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }
}
