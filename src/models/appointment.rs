use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, IdPrefix};
use super::{display_or_unknown, require_key, UNKNOWN_NAME};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: String,
}

impl Appointment {
    /// New appointments start out Scheduled with no notes.
    pub fn new(
        appointment_id: impl Into<String>,
        patient_id: impl Into<String>,
        doctor_id: impl Into<String>,
        appointment_date: NaiveDate,
        appointment_time: NaiveTime,
    ) -> Result<Self, DatabaseError> {
        let appointment = Self {
            appointment_id: appointment_id.into(),
            patient_id: patient_id.into(),
            doctor_id: doctor_id.into(),
            appointment_date,
            appointment_time,
            status: AppointmentStatus::Scheduled,
            notes: String::new(),
        };
        appointment.validate()?;
        Ok(appointment)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_key("Appointment", "appointment_id", &self.appointment_id, IdPrefix::Appointment)?;
        require_key("Appointment", "patient_id", &self.patient_id, IdPrefix::Patient)?;
        require_key("Appointment", "doctor_id", &self.doctor_id, IdPrefix::Doctor)?;
        // Stored as HH:MM.
        if self.appointment_time.second() != 0 || self.appointment_time.nanosecond() != 0 {
            return Err(DatabaseError::validation(
                "Appointment",
                format!("appointment_time {} is not a whole minute", self.appointment_time),
            ));
        }
        Ok(())
    }
}

/// Appointment row enriched with the names found by left-joining patients
/// and doctors. Names are `None` when the referenced row is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListing {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_specialization: Option<String>,
}

impl AppointmentListing {
    pub fn display_patient(&self) -> String {
        display_or_unknown(self.patient_name.as_deref())
    }

    pub fn display_doctor(&self) -> String {
        match self.doctor_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("Dr. {name}"),
            _ => UNKNOWN_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Appointment {
        Appointment::new(
            "APT-C3D4E5F6",
            "PAT-A1B2C3D4",
            "DOC-B2C3D4E5",
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn new_appointment_is_scheduled() {
        assert_eq!(sample().status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn doctor_key_must_be_doctor() {
        let mut a = sample();
        a.doctor_id = "PAT-A1B2C3D4".into();
        assert!(a.validate().is_err());
    }

    #[test]
    fn time_must_be_whole_minutes() {
        let mut a = sample();
        a.appointment_time = NaiveTime::from_hms_opt(10, 0, 30).unwrap();
        assert!(a.validate().is_err());
        a.appointment_time = NaiveTime::from_hms_milli_opt(10, 0, 0, 500).unwrap();
        assert!(a.validate().is_err());
    }

    #[test]
    fn orphan_listing_displays_unknown() {
        let listing = AppointmentListing {
            appointment: sample(),
            patient_name: None,
            doctor_name: None,
            doctor_specialization: None,
        };
        assert_eq!(listing.display_patient(), "Unknown");
        assert_eq!(listing.display_doctor(), "Unknown");
    }

    #[test]
    fn listing_serializes_flat() {
        let listing = AppointmentListing {
            appointment: sample(),
            patient_name: Some("Jane Doe".into()),
            doctor_name: Some("John Smith".into()),
            doctor_specialization: Some("Cardiology".into()),
        };
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["appointment_id"], "APT-C3D4E5F6");
        assert_eq!(json["patient_name"], "Jane Doe");
        assert_eq!(listing.display_doctor(), "Dr. John Smith");
    }
}
