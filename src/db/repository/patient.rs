use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{collect_readable, date_column, date_to_sql, like_pattern, text_column};
use crate::db::DatabaseError;
use crate::helpers;
use crate::models::*;

const PATIENT_COLUMNS: &str = "patient_id, first_name, last_name, date_of_birth, gender, phone,
     email, address, emergency_contact, emergency_phone, blood_group, allergies";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    patient.validate()?;
    conn.execute(
        "INSERT INTO patients (patient_id, first_name, last_name, date_of_birth, gender, phone,
         email, address, emergency_contact, emergency_phone, blood_group, allergies)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            patient.patient_id,
            patient.first_name,
            patient.last_name,
            date_to_sql(patient.date_of_birth),
            patient.gender,
            patient.phone,
            patient.email,
            patient.address,
            patient.emergency_contact,
            patient.emergency_phone,
            patient.blood_group,
            patient.allergies,
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, patient_id: &str) -> Result<Option<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE patient_id = ?1");
    conn.query_row(&sql, params![patient_id], row_to_patient)
        .optional()
        .map_err(DatabaseError::from)
}

/// All patients, most recently registered first.
pub fn get_all_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_patient)?;
    collect_readable("patients", rows)
}

/// Case-insensitive substring match over id, names, phone and email.
pub fn search_patients(conn: &Connection, query: &str) -> Result<Vec<Patient>, DatabaseError> {
    let sql = format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE LOWER(patient_id) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(first_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(last_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(first_name || ' ' || last_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(phone) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(email) LIKE LOWER(?1) ESCAPE '\\'
         ORDER BY created_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(query)], row_to_patient)?;
    collect_readable("patients", rows)
}

/// Overwrite every column of the patient keyed by `patient_id`.
///
/// The key itself is immutable: the record's own `patient_id` must match.
pub fn update_patient(conn: &Connection, patient_id: &str, patient: &Patient) -> Result<(), DatabaseError> {
    patient.validate()?;
    if patient.patient_id != patient_id {
        return Err(DatabaseError::validation(
            "Patient",
            format!("patient_id cannot change from {patient_id} to {}", patient.patient_id),
        ));
    }
    let rows = conn.execute(
        "UPDATE patients SET
         first_name = ?2, last_name = ?3, date_of_birth = ?4, gender = ?5, phone = ?6,
         email = ?7, address = ?8, emergency_contact = ?9, emergency_phone = ?10,
         blood_group = ?11, allergies = ?12, updated_at = ?13
         WHERE patient_id = ?1",
        params![
            patient_id,
            patient.first_name,
            patient.last_name,
            date_to_sql(patient.date_of_birth),
            patient.gender,
            patient.phone,
            patient.email,
            patient.address,
            patient.emergency_contact,
            patient.emergency_phone,
            patient.blood_group,
            patient.allergies,
            helpers::current_datetime(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Patient", patient_id));
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        patient_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: date_column(row, 3)?,
        gender: row.get(4)?,
        phone: text_column(row, 5)?,
        email: text_column(row, 6)?,
        address: text_column(row, 7)?,
        emergency_contact: text_column(row, 8)?,
        emergency_phone: text_column(row, 9)?,
        blood_group: text_column(row, 10)?,
        allergies: text_column(row, 11)?,
    })
}
