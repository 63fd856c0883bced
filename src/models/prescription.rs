use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::IdPrefix;
use super::{display_or_unknown, require_key, require_text, UNKNOWN_NAME};
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub prescription_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub prescription_date: NaiveDate,
    pub diagnosis: String,
    pub notes: String,
}

impl Prescription {
    pub fn new(
        prescription_id: impl Into<String>,
        patient_id: impl Into<String>,
        doctor_id: impl Into<String>,
        prescription_date: NaiveDate,
    ) -> Result<Self, DatabaseError> {
        let prescription = Self {
            prescription_id: prescription_id.into(),
            patient_id: patient_id.into(),
            doctor_id: doctor_id.into(),
            appointment_id: None,
            prescription_date,
            diagnosis: String::new(),
            notes: String::new(),
        };
        prescription.validate()?;
        Ok(prescription)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_key("Prescription", "prescription_id", &self.prescription_id, IdPrefix::Prescription)?;
        require_key("Prescription", "patient_id", &self.patient_id, IdPrefix::Patient)?;
        require_key("Prescription", "doctor_id", &self.doctor_id, IdPrefix::Doctor)?;
        if let Some(apt) = &self.appointment_id {
            require_key("Prescription", "appointment_id", apt, IdPrefix::Appointment)?;
        }
        Ok(())
    }
}

/// One medicine line. Items have no key of their own; they live and die
/// with their prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub instructions: String,
}

impl PrescriptionItem {
    pub fn new(
        medicine_name: impl Into<String>,
        dosage: impl Into<String>,
        frequency: impl Into<String>,
        duration: impl Into<String>,
    ) -> Result<Self, DatabaseError> {
        let item = Self {
            medicine_name: medicine_name.into(),
            dosage: dosage.into(),
            frequency: frequency.into(),
            duration: duration.into(),
            instructions: String::new(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_text("PrescriptionItem", "medicine_name", &self.medicine_name)?;
        require_text("PrescriptionItem", "dosage", &self.dosage)?;
        require_text("PrescriptionItem", "frequency", &self.frequency)?;
        require_text("PrescriptionItem", "duration", &self.duration)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionListing {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
}

impl PrescriptionListing {
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
