//! Repository layer: entity-scoped database operations.
//!
//! Every function takes a borrowed connection and returns
//! `Result<_, DatabaseError>`. The boolean/`Option` contract seen by callers
//! lives one level up in `RecordsStore`.

mod appointment;
mod backup;
mod billing;
mod doctor;
mod medicine;
mod patient;
mod prescription;
mod statistics;
mod user;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Row;

use crate::db::DatabaseError;
use crate::helpers::{self, DATE_FORMAT, TIME_FORMAT};

// Re-export all public items from sub-modules
pub use appointment::*;
pub use backup::*;
pub use billing::*;
pub use doctor::*;
pub use medicine::*;
pub use patient::*;
pub use prescription::*;
pub use statistics::*;
pub use user::*;

/// SQL expression for "First Last" over a table alias. Yields NULL when the
/// left join found no row.
pub(crate) fn full_name_sql(alias: &str) -> String {
    format!("{alias}.first_name || ' ' || {alias}.last_name")
}

/// Build a `LIKE ... ESCAPE '\'` pattern matching `query` as a literal
/// substring, so `%` and `_` typed by a user are not wildcards.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub(crate) fn date_to_sql(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn time_to_sql(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    helpers::parse_date(&raw).ok_or_else(|| conversion_error(idx, format!("invalid date '{raw}'")))
}

pub(crate) fn time_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(idx)?;
    helpers::parse_time(&raw).ok_or_else(|| conversion_error(idx, format!("invalid time '{raw}'")))
}

pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

/// Gather listing rows, leaving out any row whose stored date, time or
/// status no longer parses. Those rows are logged and stay on disk.
pub(crate) fn collect_readable<T, I>(table: &str, rows: I) -> Result<Vec<T>, DatabaseError>
where
    I: Iterator<Item = rusqlite::Result<T>>,
{
    let mut readable = Vec::new();
    for row in rows {
        match row {
            Ok(value) => readable.push(value),
            Err(e @ (rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..))) => {
                tracing::warn!(table, error = %e, "Skipping unreadable row");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(readable)
}

/// Text column that older rows may hold as NULL.
pub(crate) fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

/// Money column that older rows may hold as NULL.
pub(crate) fn amount_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<f64> {
    Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(0.0))
}

/// Optional reference column; empty strings count as absent.
pub(crate) fn reference_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(row
        .get::<_, Option<String>>(idx)?
        .filter(|s| !s.trim().is_empty()))
}
