use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::appointment::patient_name_condition;
use super::{collect_readable, date_column, date_to_sql, full_name_sql, like_pattern, reference_column, text_column};
use crate::db::DatabaseError;
use crate::models::*;

fn listing_select() -> String {
    format!(
        "SELECT pr.prescription_id, pr.patient_id, pr.doctor_id, pr.appointment_id,
                pr.prescription_date, pr.diagnosis, pr.notes,
                {patient}, {doctor}
         FROM prescriptions pr
         LEFT JOIN patients p ON pr.patient_id = p.patient_id
         LEFT JOIN doctors d ON pr.doctor_id = d.doctor_id",
        patient = full_name_sql("p"),
        doctor = full_name_sql("d"),
    )
}

fn validate_items(items: &[PrescriptionItem]) -> Result<(), DatabaseError> {
    for item in items {
        item.validate()?;
    }
    Ok(())
}

fn insert_items(conn: &Connection, prescription_id: &str, items: &[PrescriptionItem]) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT INTO prescription_items (prescription_id, medicine_name, dosage, frequency,
         duration, instructions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for item in items {
        stmt.execute(params![
            prescription_id,
            item.medicine_name,
            item.dosage,
            item.frequency,
            item.duration,
            item.instructions,
        ])?;
    }
    Ok(())
}

/// Store a prescription and its medicine lines as one unit. Either the
/// header and every item land, or nothing does.
pub fn insert_prescription(
    conn: &Connection,
    prescription: &Prescription,
    items: &[PrescriptionItem],
) -> Result<(), DatabaseError> {
    prescription.validate()?;
    validate_items(items)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO prescriptions (prescription_id, patient_id, doctor_id, appointment_id,
         prescription_date, diagnosis, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            prescription.prescription_id,
            prescription.patient_id,
            prescription.doctor_id,
            prescription.appointment_id,
            date_to_sql(prescription.prescription_date),
            prescription.diagnosis,
            prescription.notes,
        ],
    )?;
    insert_items(&tx, &prescription.prescription_id, items)?;
    tx.commit()?;
    Ok(())
}

pub fn get_prescription(
    conn: &Connection,
    prescription_id: &str,
) -> Result<Option<PrescriptionListing>, DatabaseError> {
    let sql = format!("{} WHERE pr.prescription_id = ?1", listing_select());
    conn.query_row(&sql, params![prescription_id], row_to_listing)
        .optional()
        .map_err(DatabaseError::from)
}

/// Medicine lines in the order they were written.
pub fn get_prescription_items(
    conn: &Connection,
    prescription_id: &str,
) -> Result<Vec<PrescriptionItem>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT medicine_name, dosage, frequency, duration, instructions
         FROM prescription_items WHERE prescription_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![prescription_id], |row| {
        Ok(PrescriptionItem {
            medicine_name: row.get(0)?,
            dosage: row.get(1)?,
            frequency: row.get(2)?,
            duration: row.get(3)?,
            instructions: text_column(row, 4)?,
        })
    })?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn get_all_prescriptions(conn: &Connection) -> Result<Vec<PrescriptionListing>, DatabaseError> {
    filter_prescriptions(conn, &PrescriptionFilter::default())
}

pub fn get_prescriptions_by_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<PrescriptionListing>, DatabaseError> {
    filter_prescriptions(
        conn,
        &PrescriptionFilter {
            date: Some(date),
            ..Default::default()
        },
    )
}

pub fn get_prescriptions_by_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Vec<PrescriptionListing>, DatabaseError> {
    filter_prescriptions(
        conn,
        &PrescriptionFilter {
            patient_id: Some(patient_id.to_string()),
            ..Default::default()
        },
    )
}

pub fn get_prescriptions_by_patient_name(
    conn: &Connection,
    name: &str,
) -> Result<Vec<PrescriptionListing>, DatabaseError> {
    filter_prescriptions(
        conn,
        &PrescriptionFilter {
            patient_name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

/// Newest prescription first; every set criterion must hold.
pub fn filter_prescriptions(
    conn: &Connection,
    filter: &PrescriptionFilter,
) -> Result<Vec<PrescriptionListing>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(patient_id) = filter.patient_id.as_deref() {
        values.push(patient_id.to_string());
        conditions.push(format!("pr.patient_id = ?{}", values.len()));
    }
    if let Some(name) = filter.patient_name.as_deref() {
        values.push(like_pattern(name.trim()));
        conditions.push(patient_name_condition(values.len()));
    }
    if let Some(date) = filter.date {
        values.push(date_to_sql(date));
        conditions.push(format!("pr.prescription_date = ?{}", values.len()));
    }

    let mut sql = listing_select();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY pr.prescription_date DESC, pr.created_at DESC, pr.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), row_to_listing)?;
    collect_readable("prescriptions", rows)
}

/// Rewrite the header and replace the full item list in one transaction.
pub fn update_prescription(
    conn: &Connection,
    prescription_id: &str,
    prescription: &Prescription,
    items: &[PrescriptionItem],
) -> Result<(), DatabaseError> {
    prescription.validate()?;
    validate_items(items)?;
    if prescription.prescription_id != prescription_id {
        return Err(DatabaseError::validation(
            "Prescription",
            format!(
                "prescription_id cannot change from {prescription_id} to {}",
                prescription.prescription_id
            ),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    let rows = tx.execute(
        "UPDATE prescriptions SET
         patient_id = ?2, doctor_id = ?3, appointment_id = ?4, prescription_date = ?5,
         diagnosis = ?6, notes = ?7
         WHERE prescription_id = ?1",
        params![
            prescription_id,
            prescription.patient_id,
            prescription.doctor_id,
            prescription.appointment_id,
            date_to_sql(prescription.prescription_date),
            prescription.diagnosis,
            prescription.notes,
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Prescription", prescription_id));
    }
    tx.execute(
        "DELETE FROM prescription_items WHERE prescription_id = ?1",
        params![prescription_id],
    )?;
    insert_items(&tx, prescription_id, items)?;
    tx.commit()?;
    Ok(())
}

/// Distinct medicine names ever prescribed, alphabetically.
pub fn get_prescribed_medicine_names(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT medicine_name FROM prescription_items
         WHERE TRIM(medicine_name) != ''
         ORDER BY medicine_name COLLATE NOCASE",
    )?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<PrescriptionListing> {
    Ok(PrescriptionListing {
        prescription: Prescription {
            prescription_id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            appointment_id: reference_column(row, 3)?,
            prescription_date: date_column(row, 4)?,
            diagnosis: text_column(row, 5)?,
            notes: text_column(row, 6)?,
        },
        patient_name: row.get(7)?,
        doctor_name: row.get(8)?,
    })
}
