use std::path::Path;

use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OpenFlags};

use crate::db::sqlite::run_migrations;
use crate::db::DatabaseError;

/// Copy the live database into `dest` page by page through the online
/// backup API. The source stays usable throughout.
pub fn backup_database(conn: &Connection, dest: &Path) -> Result<(), DatabaseError> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    conn.backup(DatabaseName::Main, dest, None)?;
    tracing::info!(path = %dest.display(), "Database backup written");
    Ok(())
}

/// Replace the live contents with those of the backup at `src`, then bring
/// the schema up to date. The source must be a readable records database.
pub fn restore_database(conn: &mut Connection, src: &Path) -> Result<(), DatabaseError> {
    check_backup_file(src)?;
    conn.restore(DatabaseName::Main, src, None::<fn(Progress)>)?;
    run_migrations(conn)?;
    tracing::info!(path = %src.display(), "Database restored from backup");
    Ok(())
}

fn check_backup_file(src: &Path) -> Result<(), DatabaseError> {
    if !src.is_file() {
        return Err(DatabaseError::validation(
            "backup",
            format!("{} does not exist", src.display()),
        ));
    }
    let candidate = Connection::open_with_flags(src, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let integrity: String = candidate.query_row("PRAGMA quick_check", [], |row| row.get(0))?;
    if integrity != "ok" {
        return Err(DatabaseError::validation(
            "backup",
            format!("{} failed integrity check: {integrity}", src.display()),
        ));
    }
    let has_records: bool = candidate.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'patients')",
        [],
        |row| row.get(0),
    )?;
    if !has_records {
        return Err(DatabaseError::validation(
            "backup",
            format!("{} is not a records database", src.display()),
        ));
    }
    Ok(())
}
