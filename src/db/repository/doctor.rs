use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{amount_column, like_pattern, text_column};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "doctor_id, first_name, last_name, specialization, qualification,
     phone, email, address, consultation_fee, available_days, available_time";

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    doctor.validate()?;
    conn.execute(
        "INSERT INTO doctors (doctor_id, first_name, last_name, specialization, qualification,
         phone, email, address, consultation_fee, available_days, available_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            doctor.doctor_id,
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.qualification,
            doctor.phone,
            doctor.email,
            doctor.address,
            doctor.consultation_fee,
            doctor.available_days,
            doctor.available_time,
        ],
    )?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, doctor_id: &str) -> Result<Option<Doctor>, DatabaseError> {
    let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE doctor_id = ?1");
    conn.query_row(&sql, params![doctor_id], row_to_doctor)
        .optional()
        .map_err(DatabaseError::from)
}

/// All doctors grouped by specialization, then by last name.
pub fn get_all_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         ORDER BY specialization COLLATE NOCASE, last_name COLLATE NOCASE, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn search_doctors(conn: &Connection, query: &str) -> Result<Vec<Doctor>, DatabaseError> {
    let sql = format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors
         WHERE LOWER(doctor_id) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(first_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(last_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(first_name || ' ' || last_name) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(specialization) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(phone) LIKE LOWER(?1) ESCAPE '\\'
            OR LOWER(email) LIKE LOWER(?1) ESCAPE '\\'
         ORDER BY specialization COLLATE NOCASE, last_name COLLATE NOCASE, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![like_pattern(query)], row_to_doctor)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn update_doctor(conn: &Connection, doctor_id: &str, doctor: &Doctor) -> Result<(), DatabaseError> {
    doctor.validate()?;
    if doctor.doctor_id != doctor_id {
        return Err(DatabaseError::validation(
            "Doctor",
            format!("doctor_id cannot change from {doctor_id} to {}", doctor.doctor_id),
        ));
    }
    let rows = conn.execute(
        "UPDATE doctors SET
         first_name = ?2, last_name = ?3, specialization = ?4, qualification = ?5, phone = ?6,
         email = ?7, address = ?8, consultation_fee = ?9, available_days = ?10, available_time = ?11
         WHERE doctor_id = ?1",
        params![
            doctor_id,
            doctor.first_name,
            doctor.last_name,
            doctor.specialization,
            doctor.qualification,
            doctor.phone,
            doctor.email,
            doctor.address,
            doctor.consultation_fee,
            doctor.available_days,
            doctor.available_time,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Doctor", doctor_id));
    }
    Ok(())
}

/// Remove a doctor nobody points at. Doctors still referenced by an
/// appointment or prescription are kept.
pub fn delete_doctor(conn: &Connection, doctor_id: &str) -> Result<(), DatabaseError> {
    let references: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1)
              + (SELECT COUNT(*) FROM prescriptions WHERE doctor_id = ?1)",
        params![doctor_id],
        |row| row.get(0),
    )?;
    if references > 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "doctor {doctor_id} is referenced by {references} appointment(s) or prescription(s)"
        )));
    }
    let rows = conn.execute("DELETE FROM doctors WHERE doctor_id = ?1", params![doctor_id])?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Doctor", doctor_id));
    }
    Ok(())
}

pub fn count_doctors(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
    Ok(count)
}

fn row_to_doctor(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        doctor_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        specialization: row.get(3)?,
        qualification: text_column(row, 4)?,
        phone: text_column(row, 5)?,
        email: text_column(row, 6)?,
        address: text_column(row, 7)?,
        consultation_fee: amount_column(row, 8)?,
        available_days: text_column(row, 9)?,
        available_time: text_column(row, 10)?,
    })
}
