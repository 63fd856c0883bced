//! Business-key generation and small date/contact helpers shared by the
//! record types and their callers.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::models::enums::IdPrefix;

/// Storage format for every date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for appointment times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Length of the random suffix in a business key.
const ID_SUFFIX_LEN: usize = 8;

/// Generate a business key such as `PAT-1A2B3C4D`.
///
/// The suffix is the first eight hex digits of a random v4 UUID, upper-cased.
/// Keys are random, not sequential; uniqueness is enforced by the store.
pub fn generate_id(prefix: IdPrefix) -> String {
    let uuid = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", prefix.as_str(), &uuid[..ID_SUFFIX_LEN])
}

/// Check that `key` looks like `PREFIX-XXXXXXXX` for the expected prefix.
///
/// Only the prefix and a non-blank suffix are required, so keys imported from
/// older data with different suffix lengths remain valid.
pub fn has_prefix(key: &str, prefix: IdPrefix) -> bool {
    key.strip_prefix(prefix.as_str())
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| !suffix.trim().is_empty())
}

/// Normalise an ISO date or datetime string to `YYYY-MM-DD`.
///
/// Input that does not parse is returned unchanged.
pub fn format_date(value: &str) -> String {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(&trimmed.replace('Z', "+00:00")) {
        return dt.format(DATE_FORMAT).to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return dt.format(DATE_FORMAT).to_string();
        }
    }
    match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        Ok(d) => d.format(DATE_FORMAT).to_string(),
        Err(_) => value.to_string(),
    }
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parse `HH:MM`, tolerating a trailing seconds field.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn current_date() -> NaiveDate {
    Local::now().date_naive()
}

/// Current local time as `HH:MM`.
pub fn current_time() -> String {
    Local::now().format(TIME_FORMAT).to_string()
}

/// Current local datetime in ISO 8601 form.
pub fn current_datetime() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Loose email check: one `@` with a dotted domain after it.
pub fn validate_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

/// Digits only once `-`, spaces and `+` are removed.
pub fn validate_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, '-' | ' ' | '+'))
        .collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
