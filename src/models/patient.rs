use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::IdPrefix;
use super::{check_contact, require_key, require_text};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub blood_group: String,
    pub allergies: String,
}

impl Patient {
    /// Build a patient with the required fields; contact and medical
    /// fields start empty.
    pub fn new(
        patient_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        date_of_birth: NaiveDate,
        gender: impl Into<String>,
    ) -> Result<Self, DatabaseError> {
        let patient = Self {
            patient_id: patient_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth,
            gender: gender.into(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            emergency_contact: String::new(),
            emergency_phone: String::new(),
            blood_group: String::new(),
            allergies: String::new(),
        };
        patient.validate()?;
        Ok(patient)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_key("Patient", "patient_id", &self.patient_id, IdPrefix::Patient)?;
        require_text("Patient", "first_name", &self.first_name)?;
        require_text("Patient", "last_name", &self.last_name)?;
        require_text("Patient", "gender", &self.gender)?;
        check_contact("Patient", &self.phone, &self.email)?;
        if !self.emergency_phone.trim().is_empty() {
            check_contact("Patient", &self.emergency_phone, "")?;
        }
        Ok(())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
    }

    #[test]
    fn new_patient_has_empty_optional_fields() {
        let p = Patient::new("PAT-A1B2C3D4", "Jane", "Doe", dob(), "Female").unwrap();
        assert_eq!(p.full_name(), "Jane Doe");
        assert!(p.phone.is_empty());
        assert!(p.allergies.is_empty());
    }

    #[test]
    fn blank_last_name_rejected() {
        let err = Patient::new("PAT-A1B2C3D4", "Jane", "  ", dob(), "Female").unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { entity: "Patient", .. }));
    }

    #[test]
    fn wrong_prefix_rejected() {
        assert!(Patient::new("DOC-A1B2C3D4", "Jane", "Doe", dob(), "Female").is_err());
    }

    #[test]
    fn malformed_email_rejected_on_validate() {
        let mut p = Patient::new("PAT-A1B2C3D4", "Jane", "Doe", dob(), "Female").unwrap();
        p.email = "jane-at-example".into();
        assert!(p.validate().is_err());
        p.email = "jane@example.com".into();
        assert!(p.validate().is_ok());
    }
}
