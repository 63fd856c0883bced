use std::path::PathBuf;

use chrono::NaiveDateTime;

/// Application-level constants
pub const APP_NAME: &str = "Hospital Management System";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the records database inside the data directory.
pub const DATABASE_FILE_NAME: &str = "hospital.db";

/// Overrides the database location when set.
pub const DATABASE_PATH_ENV: &str = "HOSPITAL_RECORDS_DB";

/// When set and non-empty, `run()` writes a timestamped backup into
/// `backup_dir()` after opening the database.
pub const BACKUP_ON_START_ENV: &str = "HOSPITAL_RECORDS_BACKUP";

/// Get the application data directory.
/// Platform data dir (e.g. ~/.local/share) joined with the app name,
/// falling back to the home directory, then the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Records database path: `$HOSPITAL_RECORDS_DB` if set and non-empty,
/// otherwise `hospital.db` in the data directory.
pub fn database_path() -> PathBuf {
    match std::env::var_os(DATABASE_PATH_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => app_data_dir().join(DATABASE_FILE_NAME),
    }
}

/// Directory for the daily log files
pub fn log_dir() -> PathBuf {
    app_data_dir().join("logs")
}

/// Directory offered as the default backup destination
pub fn backup_dir() -> PathBuf {
    app_data_dir().join("backups")
}

/// `hospital_backup_YYYYMMDD_HHMMSS.db`
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!("hospital_backup_{}.db", at.format("%Y%m%d_%H%M%S"))
}

pub fn backup_requested() -> bool {
    std::env::var_os(BACKUP_ON_START_ENV).is_some_and(|v| !v.is_empty())
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,hospital_records_lib=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn support_dirs_under_app_data() {
        let app = app_data_dir();
        assert!(log_dir().starts_with(&app));
        assert!(log_dir().ends_with("logs"));
        assert!(backup_dir().starts_with(&app));
    }

    #[test]
    fn backup_file_name_is_timestamped() {
        let at = chrono::NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(backup_file_name(at), "hospital_backup_20250115_090507.db");
    }

    #[test]
    fn default_filter_enables_crate_debug() {
        assert!(default_log_filter().contains("hospital_records_lib=debug"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
