use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::{collect_readable, date_column, date_to_sql, enum_column, full_name_sql, like_pattern, text_column, time_column, time_to_sql};
use crate::db::DatabaseError;
use crate::helpers;
use crate::models::enums::{check_appointment_transition, AppointmentStatus};
use crate::models::*;

const NEWEST_FIRST: &str = "a.appointment_date DESC, a.appointment_time DESC, a.id DESC";
const EARLIEST_FIRST: &str = "a.appointment_time ASC, a.id ASC";

fn listing_select() -> String {
    format!(
        "SELECT a.appointment_id, a.patient_id, a.doctor_id, a.appointment_date,
                a.appointment_time, a.status, a.notes,
                {patient}, {doctor}, d.specialization
         FROM appointments a
         LEFT JOIN patients p ON a.patient_id = p.patient_id
         LEFT JOIN doctors d ON a.doctor_id = d.doctor_id",
        patient = full_name_sql("p"),
        doctor = full_name_sql("d"),
    )
}

/// Patient-name predicate over the `p` alias; binds the same LIKE pattern
/// three times through one numbered parameter.
pub(crate) fn patient_name_condition(param: usize) -> String {
    format!(
        "(LOWER(p.first_name) LIKE LOWER(?{param}) ESCAPE '\\'
          OR LOWER(p.last_name) LIKE LOWER(?{param}) ESCAPE '\\'
          OR LOWER(p.first_name || ' ' || p.last_name) LIKE LOWER(?{param}) ESCAPE '\\')"
    )
}

pub fn insert_appointment(conn: &Connection, appointment: &Appointment) -> Result<(), DatabaseError> {
    appointment.validate()?;
    conn.execute(
        "INSERT INTO appointments (appointment_id, patient_id, doctor_id, appointment_date,
         appointment_time, status, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            appointment.appointment_id,
            appointment.patient_id,
            appointment.doctor_id,
            date_to_sql(appointment.appointment_date),
            time_to_sql(appointment.appointment_time),
            appointment.status.as_str(),
            appointment.notes,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(
    conn: &Connection,
    appointment_id: &str,
) -> Result<Option<AppointmentListing>, DatabaseError> {
    let sql = format!("{} WHERE a.appointment_id = ?1", listing_select());
    conn.query_row(&sql, params![appointment_id], row_to_listing)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_all_appointments(conn: &Connection) -> Result<Vec<AppointmentListing>, DatabaseError> {
    filter_appointments(conn, &AppointmentFilter::default())
}

/// Appointments on one day, in clock order.
pub fn get_appointments_by_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<Vec<AppointmentListing>, DatabaseError> {
    filter_appointments(
        conn,
        &AppointmentFilter {
            date: Some(date),
            ..Default::default()
        },
    )
}

/// The day's schedule; `None` means the local calendar date.
pub fn get_todays_appointments(
    conn: &Connection,
    date: Option<NaiveDate>,
) -> Result<Vec<AppointmentListing>, DatabaseError> {
    get_appointments_by_date(conn, date.unwrap_or_else(helpers::current_date))
}

pub fn get_appointments_by_status(
    conn: &Connection,
    status: AppointmentStatus,
) -> Result<Vec<AppointmentListing>, DatabaseError> {
    filter_appointments(
        conn,
        &AppointmentFilter {
            status: Some(status),
            ..Default::default()
        },
    )
}

pub fn get_appointments_by_patient_name(
    conn: &Connection,
    name: &str,
) -> Result<Vec<AppointmentListing>, DatabaseError> {
    filter_appointments(
        conn,
        &AppointmentFilter {
            patient_name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

/// Every set criterion must hold. A date narrows to one day and switches to
/// clock order; otherwise the newest appointment comes first.
pub fn filter_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<AppointmentListing>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(name) = filter.patient_name.as_deref() {
        values.push(like_pattern(name.trim()));
        conditions.push(patient_name_condition(values.len()));
    }
    if let Some(date) = filter.date {
        values.push(date_to_sql(date));
        conditions.push(format!("a.appointment_date = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        conditions.push(format!("a.status = ?{}", values.len()));
    }

    let mut sql = listing_select();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    let order = if filter.date.is_some() { EARLIEST_FIRST } else { NEWEST_FIRST };
    sql.push_str(" ORDER BY ");
    sql.push_str(order);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), row_to_listing)?;
    collect_readable("appointments", rows)
}

/// Rewrite an appointment. A status change must follow the appointment
/// lifecycle; once an outcome is recorded it stays.
pub fn update_appointment(
    conn: &Connection,
    appointment_id: &str,
    appointment: &Appointment,
) -> Result<(), DatabaseError> {
    appointment.validate()?;
    if appointment.appointment_id != appointment_id {
        return Err(DatabaseError::validation(
            "Appointment",
            format!(
                "appointment_id cannot change from {appointment_id} to {}",
                appointment.appointment_id
            ),
        ));
    }
    let current = current_status(conn, appointment_id)?;
    check_appointment_transition(current, appointment.status)?;

    conn.execute(
        "UPDATE appointments SET
         patient_id = ?2, doctor_id = ?3, appointment_date = ?4, appointment_time = ?5,
         status = ?6, notes = ?7
         WHERE appointment_id = ?1",
        params![
            appointment_id,
            appointment.patient_id,
            appointment.doctor_id,
            date_to_sql(appointment.appointment_date),
            time_to_sql(appointment.appointment_time),
            appointment.status.as_str(),
            appointment.notes,
        ],
    )?;
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    appointment_id: &str,
    status: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let current = current_status(conn, appointment_id)?;
    check_appointment_transition(current, status)?;
    conn.execute(
        "UPDATE appointments SET status = ?2 WHERE appointment_id = ?1",
        params![appointment_id, status.as_str()],
    )?;
    Ok(())
}

pub fn cancel_appointment(conn: &Connection, appointment_id: &str) -> Result<(), DatabaseError> {
    set_appointment_status(conn, appointment_id, AppointmentStatus::Cancelled)
}

fn current_status(conn: &Connection, appointment_id: &str) -> Result<AppointmentStatus, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT status FROM appointments WHERE appointment_id = ?1",
            params![appointment_id],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => s.parse(),
        None => Err(DatabaseError::not_found("Appointment", appointment_id)),
    }
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<AppointmentListing> {
    Ok(AppointmentListing {
        appointment: Appointment {
            appointment_id: row.get(0)?,
            patient_id: row.get(1)?,
            doctor_id: row.get(2)?,
            appointment_date: date_column(row, 3)?,
            appointment_time: time_column(row, 4)?,
            status: enum_column(row, 5)?,
            notes: text_column(row, 6)?,
        },
        patient_name: row.get(7)?,
        doctor_name: row.get(8)?,
        doctor_specialization: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{delete_doctor, insert_patient};

    fn appointment(id: &str, day: u32, hour: u32) -> Appointment {
        Appointment::new(id, "PAT-A1B2C3D4", "DOC-B2C3D4E5", date(2025, 1, day), time(hour, 0)).unwrap()
    }

    #[test]
    fn joined_read_carries_names() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &checkup()).unwrap();

        let listing = get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap();
        assert_eq!(listing.appointment, checkup());
        assert_eq!(listing.patient_name.as_deref(), Some("Jane Doe"));
        assert_eq!(listing.doctor_name.as_deref(), Some("John Smith"));
        assert_eq!(listing.doctor_specialization.as_deref(), Some("Cardiology"));
        assert_eq!(listing.display_doctor(), "Dr. John Smith");
    }

    #[test]
    fn orphaned_references_still_listed() {
        let conn = test_db();
        insert_appointment(&conn, &checkup()).unwrap();

        let all = get_all_appointments(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].patient_name, None);
        assert_eq!(all[0].doctor_name, None);
        assert_eq!(all[0].display_patient(), "Unknown");
    }

    #[test]
    fn unreadable_row_is_skipped_not_fatal() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        for (id, hour) in [("APT-00000001", 9), ("APT-00000002", 10), ("APT-00000003", 11)] {
            insert_appointment(&conn, &appointment(id, 15, hour)).unwrap();
        }
        conn.execute(
            "INSERT INTO appointments (appointment_id, patient_id, doctor_id, appointment_date, appointment_time)
             VALUES ('APT-00000004', 'PAT-A1B2C3D4', 'DOC-B2C3D4E5', '2025-01-15', '9:00 AM')",
            [],
        )
        .unwrap();

        assert_eq!(get_all_appointments(&conn).unwrap().len(), 3);
        assert_eq!(get_appointments_by_date(&conn, date(2025, 1, 15)).unwrap().len(), 3);
        assert_eq!(get_appointments_by_patient_name(&conn, "jane").unwrap().len(), 3);
    }

    #[test]
    fn stored_time_reads_back_unchanged() {
        let conn = test_db();
        let mut late = checkup();
        late.appointment_time = chrono::NaiveTime::from_hms_opt(10, 0, 30).unwrap();
        assert!(matches!(
            insert_appointment(&conn, &late),
            Err(DatabaseError::Validation { .. })
        ));
        assert!(get_appointment(&conn, "APT-C3D4E5F6").unwrap().is_none());

        insert_appointment(&conn, &checkup()).unwrap();
        let stored = get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap();
        assert_eq!(stored.appointment, checkup());
    }

    #[test]
    fn duplicate_appointment_rejected() {
        let conn = test_db();
        insert_appointment(&conn, &checkup()).unwrap();
        let mut again = checkup();
        again.notes = "second".into();
        assert!(insert_appointment(&conn, &again).unwrap_err().is_unique_violation());
        let stored = get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap();
        assert_eq!(stored.appointment.notes, "");
    }

    #[test]
    fn listing_order_depends_on_date_filter() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &appointment("APT-00000001", 15, 14)).unwrap();
        insert_appointment(&conn, &appointment("APT-00000002", 15, 9)).unwrap();
        insert_appointment(&conn, &appointment("APT-00000003", 16, 8)).unwrap();

        let ids = |v: Vec<AppointmentListing>| -> Vec<String> {
            v.into_iter().map(|l| l.appointment.appointment_id).collect()
        };
        assert_eq!(
            ids(get_all_appointments(&conn).unwrap()),
            ["APT-00000003", "APT-00000001", "APT-00000002"]
        );
        assert_eq!(
            ids(get_appointments_by_date(&conn, date(2025, 1, 15)).unwrap()),
            ["APT-00000002", "APT-00000001"]
        );
        assert_eq!(
            ids(get_todays_appointments(&conn, Some(date(2025, 1, 16))).unwrap()),
            ["APT-00000003"]
        );
    }

    #[test]
    fn filter_combines_criteria() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_patient(
            &conn,
            &Patient::new("PAT-00000009", "Bob", "Stone", date(1970, 3, 3), "Male").unwrap(),
        )
        .unwrap();
        insert_appointment(&conn, &appointment("APT-00000001", 15, 9)).unwrap();
        let mut bob = appointment("APT-00000002", 15, 10);
        bob.patient_id = "PAT-00000009".into();
        insert_appointment(&conn, &bob).unwrap();
        set_appointment_status(&conn, "APT-00000002", AppointmentStatus::Completed).unwrap();

        let filter = AppointmentFilter {
            patient_name: Some("STONE".into()),
            date: Some(date(2025, 1, 15)),
            status: Some(AppointmentStatus::Completed),
        };
        let hits = filter_appointments(&conn, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].appointment.appointment_id, "APT-00000002");

        assert_eq!(get_appointments_by_patient_name(&conn, "jane doe").unwrap().len(), 1);
        assert_eq!(
            get_appointments_by_status(&conn, AppointmentStatus::Scheduled).unwrap().len(),
            1
        );
        assert_eq!(filter_appointments(&conn, &AppointmentFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn completing_leaves_other_fields_untouched() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &checkup()).unwrap();

        set_appointment_status(&conn, "APT-C3D4E5F6", AppointmentStatus::Completed).unwrap();
        let after = get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap().appointment;
        assert_eq!(after.status, AppointmentStatus::Completed);
        assert_eq!(
            Appointment {
                status: AppointmentStatus::Scheduled,
                ..after
            },
            checkup()
        );
    }

    #[test]
    fn outcomes_are_final() {
        let conn = test_db();
        insert_appointment(&conn, &checkup()).unwrap();
        cancel_appointment(&conn, "APT-C3D4E5F6").unwrap();

        let err = set_appointment_status(&conn, "APT-C3D4E5F6", AppointmentStatus::Scheduled).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));

        let mut reopened = checkup();
        reopened.status = AppointmentStatus::Completed;
        assert!(update_appointment(&conn, "APT-C3D4E5F6", &reopened).is_err());
        let stored = get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap();
        assert_eq!(stored.appointment.status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn update_rewrites_schedule() {
        let conn = test_db();
        insert_appointment(&conn, &checkup()).unwrap();
        let mut moved = checkup();
        moved.appointment_time = time(15, 30);
        moved.notes = "moved to afternoon".into();
        update_appointment(&conn, "APT-C3D4E5F6", &moved).unwrap();
        assert_eq!(get_appointment(&conn, "APT-C3D4E5F6").unwrap().unwrap().appointment, moved);
    }

    #[test]
    fn status_change_on_missing_appointment_is_not_found() {
        let conn = test_db();
        assert!(matches!(
            cancel_appointment(&conn, "APT-00000000"),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            update_appointment(&conn, "APT-C3D4E5F6", &checkup()),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn doctor_delete_blocked_then_listing_survives() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &checkup()).unwrap();
        assert!(delete_doctor(&conn, "DOC-B2C3D4E5").is_err());
        assert_eq!(get_all_appointments(&conn).unwrap().len(), 1);
    }
}
