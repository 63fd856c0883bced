use chrono::NaiveDate;

use super::enums::{AppointmentStatus, PaymentStatus};

/// Any combination of criteria; all set criteria must hold.
#[derive(Debug, Default, Clone)]
pub struct AppointmentFilter {
    /// Case-insensitive substring of the patient's first, last or full name.
    pub patient_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct BillFilter {
    pub patient_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct PrescriptionFilter {
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub date: Option<NaiveDate>,
}
