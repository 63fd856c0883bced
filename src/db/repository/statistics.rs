use rusqlite::{params, Connection, Row};

use super::{count_doctors, count_patients, date_to_sql};
use crate::db::DatabaseError;
use crate::models::enums::{AppointmentStatus, PaymentStatus};
use crate::models::*;

/// Dashboard counters for a window. Patient and doctor totals ignore the
/// window; appointment, bill and revenue figures are restricted to it.
pub fn get_statistics(conn: &Connection, window: StatsWindow) -> Result<Statistics, DatabaseError> {
    // Unbounded: a text range that contains every stored date.
    let (from, to) = match window.bounds()? {
        Some((from, to)) => (date_to_sql(from), date_to_sql(to)),
        None => (String::new(), "\u{10FFFF}".to_string()),
    };

    let (total, scheduled, completed, cancelled, no_show): (i64, i64, i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(status = ?3), 0),
                COALESCE(SUM(status = ?4), 0),
                COALESCE(SUM(status = ?5), 0),
                COALESCE(SUM(status = ?6), 0)
         FROM appointments
         WHERE appointment_date BETWEEN ?1 AND ?2",
        params![
            from,
            to,
            AppointmentStatus::Scheduled.as_str(),
            AppointmentStatus::Completed.as_str(),
            AppointmentStatus::Cancelled.as_str(),
            AppointmentStatus::NoShow.as_str(),
        ],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
    )?;

    let (total_bills, pending_bills, total_revenue): (i64, i64, f64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(payment_status = ?3), 0),
                COALESCE(SUM(CASE WHEN payment_status = ?4 THEN total_amount END), 0.0)
         FROM billing
         WHERE bill_date BETWEEN ?1 AND ?2",
        params![from, to, PaymentStatus::Pending.as_str(), PaymentStatus::Paid.as_str()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Statistics {
        total_patients: count_patients(conn)?,
        total_doctors: count_doctors(conn)?,
        total_appointments: total,
        scheduled_appointments: scheduled,
        completed_appointments: completed,
        cancelled_appointments: cancelled,
        no_show_appointments: no_show,
        total_bills,
        pending_bills,
        total_revenue,
    })
}

/// Newest registrations, completed visits and issued bills, merged and cut
/// to `limit`.
pub fn get_recent_activities(conn: &Connection, limit: usize) -> Result<Vec<Activity>, DatabaseError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let limit_sql = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut activities = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT patient_id, first_name || ' ' || last_name, COALESCE(created_at, '')
         FROM patients ORDER BY created_at DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit_sql], |row| {
        activity(row, ActivityKind::Patient, "registered")
    })?;
    for r in rows {
        activities.push(r?);
    }

    let mut stmt = conn.prepare(
        "SELECT a.appointment_id, p.first_name || ' ' || p.last_name,
                a.appointment_date || ' ' || a.appointment_time
         FROM appointments a
         LEFT JOIN patients p ON a.patient_id = p.patient_id
         WHERE a.status = ?1
         ORDER BY a.appointment_date DESC, a.appointment_time DESC, a.id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(
        params![AppointmentStatus::Completed.as_str(), limit_sql],
        |row| activity(row, ActivityKind::Appointment, "completed"),
    )?;
    for r in rows {
        activities.push(r?);
    }

    let mut stmt = conn.prepare(
        "SELECT b.bill_id, p.first_name || ' ' || p.last_name, b.bill_date
         FROM billing b
         LEFT JOIN patients p ON b.patient_id = p.patient_id
         ORDER BY b.bill_date DESC, b.created_at DESC, b.id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit_sql], |row| {
        activity(row, ActivityKind::Bill, "generated")
    })?;
    for r in rows {
        activities.push(r?);
    }

    // Stable sort keeps each source's own order among equal timestamps.
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities.truncate(limit);
    Ok(activities)
}

fn activity(row: &Row<'_>, kind: ActivityKind, action: &str) -> rusqlite::Result<Activity> {
    Ok(Activity {
        kind,
        id: row.get(0)?,
        name: row.get(1)?,
        action: action.to_string(),
        timestamp: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;
    use crate::db::repository::{insert_appointment, insert_bill, set_appointment_status, set_payment_status};

    fn appointment(id: &str, m: u32, d: u32) -> Appointment {
        Appointment::new(id, "PAT-A1B2C3D4", "DOC-B2C3D4E5", date(2025, m, d), time(10, 0)).unwrap()
    }

    fn bill(id: &str, m: u32, d: u32, fee: f64) -> Bill {
        Bill::new(id, "PAT-A1B2C3D4", date(2025, m, d), fee, 0.0, 0.0).unwrap()
    }

    #[test]
    fn empty_store_is_all_zero() {
        let conn = test_db();
        for window in [
            StatsWindow::All,
            StatsWindow::Day(date(2025, 1, 15)),
            StatsWindow::Month { year: 2025, month: 1 },
            StatsWindow::Year(2025),
        ] {
            assert_eq!(get_statistics(&conn, window).unwrap(), Statistics::default());
        }
        assert!(get_recent_activities(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn counts_follow_the_window() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &appointment("APT-00000001", 1, 15)).unwrap();
        insert_appointment(&conn, &appointment("APT-00000002", 1, 20)).unwrap();
        insert_appointment(&conn, &appointment("APT-00000003", 2, 1)).unwrap();
        set_appointment_status(&conn, "APT-00000002", AppointmentStatus::Completed).unwrap();
        set_appointment_status(&conn, "APT-00000003", AppointmentStatus::NoShow).unwrap();

        insert_bill(&conn, &bill("BILL-00000001", 1, 15, 100.0)).unwrap();
        insert_bill(&conn, &bill("BILL-00000002", 1, 20, 50.0)).unwrap();
        insert_bill(&conn, &bill("BILL-00000003", 2, 1, 70.0)).unwrap();
        set_payment_status(&conn, "BILL-00000001", PaymentStatus::Paid, None).unwrap();
        set_payment_status(&conn, "BILL-00000003", PaymentStatus::Paid, None).unwrap();

        let all = get_statistics(&conn, StatsWindow::All).unwrap();
        assert_eq!(all.total_patients, 1);
        assert_eq!(all.total_doctors, 1);
        assert_eq!(all.total_appointments, 3);
        assert_eq!(all.no_show_appointments, 1);
        assert_eq!(all.total_bills, 3);
        assert_eq!(all.pending_bills, 1);
        assert_eq!(all.total_revenue, 170.0);

        let january = get_statistics(&conn, StatsWindow::Month { year: 2025, month: 1 }).unwrap();
        assert_eq!(january.total_patients, 1);
        assert_eq!(january.total_appointments, 2);
        assert_eq!(january.scheduled_appointments, 1);
        assert_eq!(january.completed_appointments, 1);
        assert_eq!(january.no_show_appointments, 0);
        assert_eq!(january.total_bills, 2);
        assert_eq!(january.total_revenue, 100.0);

        let day = get_statistics(&conn, StatsWindow::Day(date(2025, 1, 20))).unwrap();
        assert_eq!(day.total_appointments, 1);
        assert_eq!(day.pending_bills, 1);
        assert_eq!(day.total_revenue, 0.0);

        let range = StatsWindow::Range {
            from: date(2025, 1, 16),
            to: date(2025, 2, 1),
        };
        let range = get_statistics(&conn, range).unwrap();
        assert_eq!(range.total_appointments, 2);
        assert_eq!(range.total_revenue, 70.0);

        assert_eq!(get_statistics(&conn, StatsWindow::Year(2024)).unwrap().total_appointments, 0);
    }

    #[test]
    fn invalid_window_is_an_error() {
        let conn = test_db();
        assert!(get_statistics(&conn, StatsWindow::Month { year: 2025, month: 0 }).is_err());
    }

    #[test]
    fn recent_activities_merge_and_truncate() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_appointment(&conn, &appointment("APT-00000001", 1, 15)).unwrap();
        insert_appointment(&conn, &appointment("APT-00000002", 1, 16)).unwrap();
        set_appointment_status(&conn, "APT-00000001", AppointmentStatus::Completed).unwrap();
        insert_bill(&conn, &bill("BILL-00000001", 1, 10, 10.0)).unwrap();

        let all = get_recent_activities(&conn, 10).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
        assert!(all.iter().any(|a| a.kind == ActivityKind::Appointment && a.id == "APT-00000001"));
        assert!(all.iter().all(|a| a.id != "APT-00000002"));
        let bill = all.iter().find(|a| a.kind == ActivityKind::Bill).unwrap();
        assert_eq!(bill.name.as_deref(), Some("Jane Doe"));
        assert_eq!(bill.action, "generated");

        assert_eq!(get_recent_activities(&conn, 2).unwrap().len(), 2);
        assert!(get_recent_activities(&conn, 0).unwrap().is_empty());
    }
}
