use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{IdPrefix, PaymentStatus};
use super::{display_or_unknown, require_amount, require_key};
use crate::db::DatabaseError;

/// Tolerance when comparing a stored total with the sum of its charges.
const TOTAL_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub bill_id: String,
    pub patient_id: String,
    pub appointment_id: Option<String>,
    pub bill_date: NaiveDate,
    pub consultation_fee: f64,
    pub medicine_cost: f64,
    pub other_charges: f64,
    /// Stored as written. The writer keeps it equal to the three charges.
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub notes: String,
}

impl Bill {
    /// Build a Pending bill whose total is the sum of the given charges.
    pub fn new(
        bill_id: impl Into<String>,
        patient_id: impl Into<String>,
        bill_date: NaiveDate,
        consultation_fee: f64,
        medicine_cost: f64,
        other_charges: f64,
    ) -> Result<Self, DatabaseError> {
        let bill = Self {
            bill_id: bill_id.into(),
            patient_id: patient_id.into(),
            appointment_id: None,
            bill_date,
            consultation_fee,
            medicine_cost,
            other_charges,
            total_amount: consultation_fee + medicine_cost + other_charges,
            payment_status: PaymentStatus::Pending,
            payment_method: String::new(),
            notes: String::new(),
        };
        bill.validate()?;
        Ok(bill)
    }

    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_key("Bill", "bill_id", &self.bill_id, IdPrefix::Bill)?;
        require_key("Bill", "patient_id", &self.patient_id, IdPrefix::Patient)?;
        if let Some(apt) = &self.appointment_id {
            require_key("Bill", "appointment_id", apt, IdPrefix::Appointment)?;
        }
        require_amount("Bill", "consultation_fee", self.consultation_fee)?;
        require_amount("Bill", "medicine_cost", self.medicine_cost)?;
        require_amount("Bill", "other_charges", self.other_charges)?;
        require_amount("Bill", "total_amount", self.total_amount)
    }

    pub fn charges_total(&self) -> f64 {
        self.consultation_fee + self.medicine_cost + self.other_charges
    }

    pub fn total_matches_charges(&self) -> bool {
        (self.total_amount - self.charges_total()).abs() < TOTAL_EPSILON
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillListing {
    #[serde(flatten)]
    pub bill: Bill,
    pub patient_name: Option<String>,
}

impl BillListing {
    pub fn display_patient(&self) -> String {
        display_or_unknown(self.patient_name.as_deref())
    }
}
