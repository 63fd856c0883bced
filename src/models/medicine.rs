use serde::{Deserialize, Serialize};

use super::require_text;
use crate::db::DatabaseError;

/// Entry in the medicine reference catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    pub medicine_name: String,
    pub company_name: String,
    pub dosage_mg: String,
    pub dosage_form: String,
    pub category: String,
    pub description: String,
    pub is_pediatric: bool,
}

impl Medicine {
    pub fn validate(&self) -> Result<(), DatabaseError> {
        require_text("Medicine", "medicine_name", &self.medicine_name)
    }
}

/// Catalog row as read back, with its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMedicine {
    pub id: i64,
    #[serde(flatten)]
    pub medicine: Medicine,
}
