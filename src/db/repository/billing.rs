use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::appointment::patient_name_condition;
use super::{amount_column, collect_readable, date_column, date_to_sql, enum_column, full_name_sql, like_pattern, reference_column, text_column};
use crate::db::DatabaseError;
use crate::models::enums::{check_payment_transition, PaymentStatus};
use crate::models::*;

fn listing_select() -> String {
    format!(
        "SELECT b.bill_id, b.patient_id, b.appointment_id, b.bill_date, b.consultation_fee,
                b.medicine_cost, b.other_charges, b.total_amount, b.payment_status,
                b.payment_method, b.notes,
                {patient}
         FROM billing b
         LEFT JOIN patients p ON b.patient_id = p.patient_id",
        patient = full_name_sql("p"),
    )
}

pub fn insert_bill(conn: &Connection, bill: &Bill) -> Result<(), DatabaseError> {
    bill.validate()?;
    if !bill.total_matches_charges() {
        tracing::warn!(
            bill_id = %bill.bill_id,
            total = bill.total_amount,
            charges = bill.charges_total(),
            "Bill total differs from the sum of its charges"
        );
    }
    conn.execute(
        "INSERT INTO billing (bill_id, patient_id, appointment_id, bill_date, consultation_fee,
         medicine_cost, other_charges, total_amount, payment_status, payment_method, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            bill.bill_id,
            bill.patient_id,
            bill.appointment_id,
            date_to_sql(bill.bill_date),
            bill.consultation_fee,
            bill.medicine_cost,
            bill.other_charges,
            bill.total_amount,
            bill.payment_status.as_str(),
            bill.payment_method,
            bill.notes,
        ],
    )?;
    Ok(())
}

pub fn get_bill(conn: &Connection, bill_id: &str) -> Result<Option<BillListing>, DatabaseError> {
    let sql = format!("{} WHERE b.bill_id = ?1", listing_select());
    conn.query_row(&sql, params![bill_id], row_to_listing)
        .optional()
        .map_err(DatabaseError::from)
}

pub fn get_all_bills(conn: &Connection) -> Result<Vec<BillListing>, DatabaseError> {
    filter_bills(conn, &BillFilter::default())
}

/// Bills for one patient key. Unlike the name search this needs no
/// matching patient row.
pub fn get_bills_by_patient_id(conn: &Connection, patient_id: &str) -> Result<Vec<BillListing>, DatabaseError> {
    let sql = format!(
        "{} WHERE b.patient_id = ?1 ORDER BY b.bill_date DESC, b.created_at DESC, b.id DESC",
        listing_select()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_id], row_to_listing)?;
    collect_readable("billing", rows)
}

pub fn get_bills_by_date(conn: &Connection, date: NaiveDate) -> Result<Vec<BillListing>, DatabaseError> {
    filter_bills(
        conn,
        &BillFilter {
            date: Some(date),
            ..Default::default()
        },
    )
}

pub fn get_bills_by_status(conn: &Connection, status: PaymentStatus) -> Result<Vec<BillListing>, DatabaseError> {
    filter_bills(
        conn,
        &BillFilter {
            status: Some(status),
            ..Default::default()
        },
    )
}

pub fn get_bills_by_patient_name(conn: &Connection, name: &str) -> Result<Vec<BillListing>, DatabaseError> {
    filter_bills(
        conn,
        &BillFilter {
            patient_name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

pub fn filter_bills(conn: &Connection, filter: &BillFilter) -> Result<Vec<BillListing>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(name) = filter.patient_name.as_deref() {
        values.push(like_pattern(name.trim()));
        conditions.push(patient_name_condition(values.len()));
    }
    if let Some(date) = filter.date {
        values.push(date_to_sql(date));
        conditions.push(format!("b.bill_date = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.as_str().to_string());
        conditions.push(format!("b.payment_status = ?{}", values.len()));
    }

    let mut sql = listing_select();
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY b.bill_date DESC, b.created_at DESC, b.id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), row_to_listing)?;
    collect_readable("billing", rows)
}

/// Rewrite a bill. Payment status only moves forward (Pending, Partial, Paid).
pub fn update_bill(conn: &Connection, bill_id: &str, bill: &Bill) -> Result<(), DatabaseError> {
    bill.validate()?;
    if bill.bill_id != bill_id {
        return Err(DatabaseError::validation(
            "Bill",
            format!("bill_id cannot change from {bill_id} to {}", bill.bill_id),
        ));
    }
    let current = current_status(conn, bill_id)?;
    check_payment_transition(current, bill.payment_status)?;
    if !bill.total_matches_charges() {
        tracing::warn!(bill_id, total = bill.total_amount, "Bill total differs from the sum of its charges");
    }

    conn.execute(
        "UPDATE billing SET
         patient_id = ?2, appointment_id = ?3, bill_date = ?4, consultation_fee = ?5,
         medicine_cost = ?6, other_charges = ?7, total_amount = ?8, payment_status = ?9,
         payment_method = ?10, notes = ?11
         WHERE bill_id = ?1",
        params![
            bill_id,
            bill.patient_id,
            bill.appointment_id,
            date_to_sql(bill.bill_date),
            bill.consultation_fee,
            bill.medicine_cost,
            bill.other_charges,
            bill.total_amount,
            bill.payment_status.as_str(),
            bill.payment_method,
            bill.notes,
        ],
    )?;
    Ok(())
}

/// Record a payment state. `payment_method` is kept unless a new one is given.
pub fn set_payment_status(
    conn: &Connection,
    bill_id: &str,
    status: PaymentStatus,
    payment_method: Option<&str>,
) -> Result<(), DatabaseError> {
    let current = current_status(conn, bill_id)?;
    check_payment_transition(current, status)?;
    conn.execute(
        "UPDATE billing SET payment_status = ?2, payment_method = COALESCE(?3, payment_method)
         WHERE bill_id = ?1",
        params![bill_id, status.as_str(), payment_method],
    )?;
    Ok(())
}

pub fn delete_bill(conn: &Connection, bill_id: &str) -> Result<(), DatabaseError> {
    let rows = conn.execute("DELETE FROM billing WHERE bill_id = ?1", params![bill_id])?;
    if rows == 0 {
        return Err(DatabaseError::not_found("Bill", bill_id));
    }
    Ok(())
}

fn current_status(conn: &Connection, bill_id: &str) -> Result<PaymentStatus, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT payment_status FROM billing WHERE bill_id = ?1",
            params![bill_id],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => s.parse(),
        None => Err(DatabaseError::not_found("Bill", bill_id)),
    }
}

fn row_to_listing(row: &Row<'_>) -> rusqlite::Result<BillListing> {
    Ok(BillListing {
        bill: Bill {
            bill_id: row.get(0)?,
            patient_id: row.get(1)?,
            appointment_id: reference_column(row, 2)?,
            bill_date: date_column(row, 3)?,
            consultation_fee: amount_column(row, 4)?,
            medicine_cost: amount_column(row, 5)?,
            other_charges: amount_column(row, 6)?,
            total_amount: amount_column(row, 7)?,
            payment_status: enum_column(row, 8)?,
            payment_method: text_column(row, 9)?,
            notes: text_column(row, 10)?,
        },
        patient_name: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;

    fn bill(id: &str, day: u32) -> Bill {
        Bill::new(id, "PAT-A1B2C3D4", date(2025, 1, day), 150.0, 40.5, 9.5).unwrap()
    }

    #[test]
    fn bill_round_trip_with_patient_name() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        let mut b = bill("BILL-00000001", 15);
        b.appointment_id = Some("APT-C3D4E5F6".into());
        b.notes = "Follow-up".into();
        insert_bill(&conn, &b).unwrap();

        let listing = get_bill(&conn, "BILL-00000001").unwrap().unwrap();
        assert_eq!(listing.bill, b);
        assert_eq!(listing.bill.total_amount, 200.0);
        assert_eq!(listing.display_patient(), "Jane Doe");
    }

    #[test]
    fn duplicate_bill_rejected() {
        let conn = test_db();
        insert_bill(&conn, &bill("BILL-00000001", 15)).unwrap();
        assert!(insert_bill(&conn, &bill("BILL-00000001", 16)).unwrap_err().is_unique_violation());
        assert_eq!(get_all_bills(&conn).unwrap().len(), 1);
    }

    #[test]
    fn negative_charge_rejected() {
        let conn = test_db();
        let mut b = bill("BILL-00000001", 15);
        b.other_charges = -1.0;
        assert!(insert_bill(&conn, &b).is_err());
        assert!(get_bill(&conn, "BILL-00000001").unwrap().is_none());
    }

    #[test]
    fn orphaned_bill_still_listed() {
        let conn = test_db();
        insert_bill(&conn, &bill("BILL-00000001", 15)).unwrap();
        let all = get_all_bills(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_patient(), "Unknown");
        assert_eq!(get_bills_by_patient_id(&conn, "PAT-A1B2C3D4").unwrap().len(), 1);
        assert!(get_bills_by_patient_name(&conn, "jane").unwrap().is_empty());
    }

    #[test]
    fn filters_and_order() {
        let conn = test_db();
        seed_jane_and_john(&conn);
        insert_bill(&conn, &bill("BILL-00000001", 14)).unwrap();
        insert_bill(&conn, &bill("BILL-00000002", 16)).unwrap();
        insert_bill(&conn, &bill("BILL-00000003", 15)).unwrap();
        set_payment_status(&conn, "BILL-00000003", PaymentStatus::Paid, Some("Cash")).unwrap();

        let ids: Vec<_> = get_all_bills(&conn)
            .unwrap()
            .into_iter()
            .map(|l| l.bill.bill_id)
            .collect();
        assert_eq!(ids, ["BILL-00000002", "BILL-00000003", "BILL-00000001"]);

        assert_eq!(get_bills_by_date(&conn, date(2025, 1, 14)).unwrap().len(), 1);
        assert_eq!(get_bills_by_status(&conn, PaymentStatus::Pending).unwrap().len(), 2);
        assert_eq!(get_bills_by_patient_name(&conn, "DOE").unwrap().len(), 3);

        let filter = BillFilter {
            patient_name: Some("jane".into()),
            date: Some(date(2025, 1, 15)),
            status: Some(PaymentStatus::Paid),
        };
        let hits = filter_bills(&conn, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bill.payment_method, "Cash");
    }

    #[test]
    fn payment_status_only_moves_forward() {
        let conn = test_db();
        insert_bill(&conn, &bill("BILL-00000001", 15)).unwrap();
        set_payment_status(&conn, "BILL-00000001", PaymentStatus::Partial, Some("Card")).unwrap();
        set_payment_status(&conn, "BILL-00000001", PaymentStatus::Paid, None).unwrap();

        let err = set_payment_status(&conn, "BILL-00000001", PaymentStatus::Pending, None).unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidTransition { .. }));

        let stored = get_bill(&conn, "BILL-00000001").unwrap().unwrap().bill;
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.payment_method, "Card");
    }

    #[test]
    fn update_rewrites_charges() {
        let conn = test_db();
        insert_bill(&conn, &bill("BILL-00000001", 15)).unwrap();
        let mut b = Bill::new("BILL-00000001", "PAT-A1B2C3D4", date(2025, 1, 15), 150.0, 0.0, 0.0).unwrap();
        b.payment_status = PaymentStatus::Paid;
        update_bill(&conn, "BILL-00000001", &b).unwrap();
        assert_eq!(get_bill(&conn, "BILL-00000001").unwrap().unwrap().bill, b);

        b.payment_status = PaymentStatus::Partial;
        assert!(update_bill(&conn, "BILL-00000001", &b).is_err());
    }

    #[test]
    fn update_missing_bill_is_not_found() {
        let conn = test_db();
        assert!(matches!(
            update_bill(&conn, "BILL-00000001", &bill("BILL-00000001", 15)),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_is_hard_and_reports_absence() {
        let conn = test_db();
        insert_bill(&conn, &bill("BILL-00000001", 15)).unwrap();
        delete_bill(&conn, "BILL-00000001").unwrap();
        assert!(get_bill(&conn, "BILL-00000001").unwrap().is_none());
        assert!(matches!(
            delete_bill(&conn, "BILL-00000001"),
            Err(DatabaseError::NotFound { .. })
        ));
    }
}
