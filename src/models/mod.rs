pub mod appointment;
pub mod bill;
pub mod doctor;
pub mod enums;
pub mod filters;
pub mod medicine;
pub mod patient;
pub mod prescription;
pub mod statistics;
pub mod user;

pub use appointment::*;
pub use bill::*;
pub use doctor::*;
pub use filters::*;
pub use medicine::*;
pub use patient::*;
pub use prescription::*;
pub use statistics::*;
pub use user::*;

use crate::db::DatabaseError;
use crate::helpers;
use crate::models::enums::IdPrefix;

/// Placeholder shown for a reference whose target row no longer exists.
pub const UNKNOWN_NAME: &str = "Unknown";

pub(crate) fn require_text(entity: &'static str, field: &str, value: &str) -> Result<(), DatabaseError> {
    if value.trim().is_empty() {
        return Err(DatabaseError::validation(entity, format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn require_key(
    entity: &'static str,
    field: &str,
    value: &str,
    prefix: IdPrefix,
) -> Result<(), DatabaseError> {
    require_text(entity, field, value)?;
    if !helpers::has_prefix(value, prefix) {
        return Err(DatabaseError::validation(
            entity,
            format!("{field} '{value}' must start with {}-", prefix.as_str()),
        ));
    }
    Ok(())
}

pub(crate) fn require_amount(entity: &'static str, field: &str, value: f64) -> Result<(), DatabaseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DatabaseError::validation(
            entity,
            format!("{field} must be a non-negative amount, got {value}"),
        ));
    }
    Ok(())
}

/// Empty contact fields are allowed; filled ones must be well formed.
pub(crate) fn check_contact(entity: &'static str, phone: &str, email: &str) -> Result<(), DatabaseError> {
    if !phone.trim().is_empty() && !helpers::validate_phone(phone) {
        return Err(DatabaseError::validation(entity, format!("phone '{phone}' is not a phone number")));
    }
    if !email.trim().is_empty() && !helpers::validate_email(email) {
        return Err(DatabaseError::validation(entity, format!("email '{email}' is not an email address")));
    }
    Ok(())
}

/// "First Last", or the placeholder when the join found no row.
pub(crate) fn display_or_unknown(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => UNKNOWN_NAME.to_string(),
    }
}
