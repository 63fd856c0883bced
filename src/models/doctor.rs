use serde::{Deserialize, Serialize};

use super::enums::IdPrefix;
use super::{check_contact, require_amount, require_key, require_text};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub doctor_id: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub qualification: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub consultation_fee: f64,
    pub available_days: String,
    pub available_time: String,
}

impl Doctor {
    pub fn new(
        doctor_id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        specialization: impl Into<String>,
    ) -> Result<Self, DatabaseError> {
        let doctor = Self {
            doctor_id: doctor_id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            specialization: specialization.into(),
            qualification: String::new(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            consultation_fee: 0.0,
            available_days: String::new(),
            available_time: String::new(),
        };
        doctor.validate()?;
        Ok(doctor)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_key("Doctor", "doctor_id", &self.doctor_id, IdPrefix::Doctor)?;
        require_text("Doctor", "first_name", &self.first_name)?;
        require_text("Doctor", "last_name", &self.last_name)?;
        require_text("Doctor", "specialization", &self.specialization)?;
        require_amount("Doctor", "consultation_fee", self.consultation_fee)?;
        check_contact("Doctor", &self.phone, &self.email)
    }

    /// "Dr. First Last"
    pub fn display_name(&self) -> String {
        format!("Dr. {} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_has_title() {
        let d = Doctor::new("DOC-B2C3D4E5", "John", "Smith", "Cardiology").unwrap();
        assert_eq!(d.display_name(), "Dr. John Smith");
    }

    #[test]
    fn negative_fee_rejected() {
        let mut d = Doctor::new("DOC-B2C3D4E5", "John", "Smith", "Cardiology").unwrap();
        d.consultation_fee = -10.0;
        assert!(d.validate().is_err());
        d.consultation_fee = f64::NAN;
        assert!(d.validate().is_err());
    }

    #[test]
    fn specialization_required() {
        assert!(Doctor::new("DOC-B2C3D4E5", "John", "Smith", "").is_err());
    }
}
