//! `RecordsStore`: the single owner of the records database.
//!
//! Every public method maps repository results onto the caller contract:
//! writes answer `bool`, single reads `Option`, listings a possibly empty
//! `Vec`. Failures never cross this boundary; they are logged here, at
//! `warn` for expected rejections (duplicate key, missing record, forbidden
//! status change, invalid input) and at `error` for everything else.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use rusqlite::Connection;

use crate::config;
use crate::db::{self, DatabaseError};
use crate::models::enums::{AppModule, AppointmentStatus, PaymentStatus};
use crate::models::*;

pub struct RecordsStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl RecordsStore {
    /// Open (or create) the database file, bring the schema up to date and
    /// seed the medicine catalog and default administrator when empty.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn = db::open_database(path)?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.seed()?;
        Ok(store)
    }

    /// Private in-memory store, mainly for tests.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let store = Self {
            conn: db::open_memory_database()?,
            path: None,
        };
        store.seed()?;
        Ok(store)
    }

    fn seed(&self) -> Result<(), DatabaseError> {
        db::seed_medicine_catalog(&self.conn)?;
        db::ensure_default_user(&self.conn)?;
        Ok(())
    }

    /// File backing this store, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the connection, reporting any error the engine raises while
    /// flushing. Dropping the store closes it too, silently.
    pub fn close(self) -> Result<(), DatabaseError> {
        self.conn.close().map_err(|(_, e)| DatabaseError::from(e))?;
        tracing::info!("Records store closed");
        Ok(())
    }

    // ── Patients ────────────────────────────────────────────────────────

    pub fn add_patient(&self, patient: &Patient) -> bool {
        succeeded("add_patient", &patient.patient_id, db::insert_patient(&self.conn, patient))
    }

    pub fn get_patient_by_id(&self, patient_id: &str) -> Option<Patient> {
        found("get_patient_by_id", patient_id, db::get_patient(&self.conn, patient_id))
    }

    pub fn get_all_patients(&self) -> Vec<Patient> {
        listed("get_all_patients", db::get_all_patients(&self.conn))
    }

    pub fn search_patients(&self, query: &str) -> Vec<Patient> {
        listed("search_patients", db::search_patients(&self.conn, query))
    }

    pub fn update_patient(&self, patient_id: &str, patient: &Patient) -> bool {
        succeeded("update_patient", patient_id, db::update_patient(&self.conn, patient_id, patient))
    }

    // ── Doctors ─────────────────────────────────────────────────────────

    pub fn add_doctor(&self, doctor: &Doctor) -> bool {
        succeeded("add_doctor", &doctor.doctor_id, db::insert_doctor(&self.conn, doctor))
    }

    pub fn get_doctor_by_id(&self, doctor_id: &str) -> Option<Doctor> {
        found("get_doctor_by_id", doctor_id, db::get_doctor(&self.conn, doctor_id))
    }

    pub fn get_all_doctors(&self) -> Vec<Doctor> {
        listed("get_all_doctors", db::get_all_doctors(&self.conn))
    }

    pub fn search_doctors(&self, query: &str) -> Vec<Doctor> {
        listed("search_doctors", db::search_doctors(&self.conn, query))
    }

    pub fn update_doctor(&self, doctor_id: &str, doctor: &Doctor) -> bool {
        succeeded("update_doctor", doctor_id, db::update_doctor(&self.conn, doctor_id, doctor))
    }

    /// False while any appointment or prescription still names the doctor.
    pub fn delete_doctor(&self, doctor_id: &str) -> bool {
        succeeded("delete_doctor", doctor_id, db::delete_doctor(&self.conn, doctor_id))
    }

    // ── Appointments ────────────────────────────────────────────────────

    pub fn add_appointment(&self, appointment: &Appointment) -> bool {
        succeeded(
            "add_appointment",
            &appointment.appointment_id,
            db::insert_appointment(&self.conn, appointment),
        )
    }

    pub fn get_appointment_by_id(&self, appointment_id: &str) -> Option<AppointmentListing> {
        found(
            "get_appointment_by_id",
            appointment_id,
            db::get_appointment(&self.conn, appointment_id),
        )
    }

    pub fn get_all_appointments(&self) -> Vec<AppointmentListing> {
        listed("get_all_appointments", db::get_all_appointments(&self.conn))
    }

    pub fn get_appointments_by_date(&self, date: NaiveDate) -> Vec<AppointmentListing> {
        listed("get_appointments_by_date", db::get_appointments_by_date(&self.conn, date))
    }

    pub fn get_appointments_by_status(&self, status: AppointmentStatus) -> Vec<AppointmentListing> {
        listed(
            "get_appointments_by_status",
            db::get_appointments_by_status(&self.conn, status),
        )
    }

    pub fn get_appointments_by_patient_name(&self, name: &str) -> Vec<AppointmentListing> {
        listed(
            "get_appointments_by_patient_name",
            db::get_appointments_by_patient_name(&self.conn, name),
        )
    }

    pub fn filter_appointments(&self, filter: &AppointmentFilter) -> Vec<AppointmentListing> {
        listed("filter_appointments", db::filter_appointments(&self.conn, filter))
    }

    /// Schedule for `date`, or for the local calendar day when `None`.
    pub fn get_todays_appointments(&self, date: Option<NaiveDate>) -> Vec<AppointmentListing> {
        listed("get_todays_appointments", db::get_todays_appointments(&self.conn, date))
    }

    pub fn update_appointment(&self, appointment_id: &str, appointment: &Appointment) -> bool {
        succeeded(
            "update_appointment",
            appointment_id,
            db::update_appointment(&self.conn, appointment_id, appointment),
        )
    }

    /// False when the appointment is missing or already has an outcome.
    pub fn set_appointment_status(&self, appointment_id: &str, status: AppointmentStatus) -> bool {
        succeeded(
            "set_appointment_status",
            appointment_id,
            db::set_appointment_status(&self.conn, appointment_id, status),
        )
    }

    pub fn cancel_appointment(&self, appointment_id: &str) -> bool {
        succeeded(
            "cancel_appointment",
            appointment_id,
            db::cancel_appointment(&self.conn, appointment_id),
        )
    }

    // ── Prescriptions ───────────────────────────────────────────────────

    /// Header and items are written together or not at all.
    pub fn add_prescription(&self, prescription: &Prescription, items: &[PrescriptionItem]) -> bool {
        succeeded(
            "add_prescription",
            &prescription.prescription_id,
            db::insert_prescription(&self.conn, prescription, items),
        )
    }

    pub fn get_prescription_by_id(&self, prescription_id: &str) -> Option<PrescriptionListing> {
        found(
            "get_prescription_by_id",
            prescription_id,
            db::get_prescription(&self.conn, prescription_id),
        )
    }

    pub fn get_prescription_items(&self, prescription_id: &str) -> Vec<PrescriptionItem> {
        listed(
            "get_prescription_items",
            db::get_prescription_items(&self.conn, prescription_id),
        )
    }

    pub fn get_all_prescriptions(&self) -> Vec<PrescriptionListing> {
        listed("get_all_prescriptions", db::get_all_prescriptions(&self.conn))
    }

    pub fn get_prescriptions_by_date(&self, date: NaiveDate) -> Vec<PrescriptionListing> {
        listed("get_prescriptions_by_date", db::get_prescriptions_by_date(&self.conn, date))
    }

    pub fn get_prescriptions_by_patient(&self, patient_id: &str) -> Vec<PrescriptionListing> {
        listed(
            "get_prescriptions_by_patient",
            db::get_prescriptions_by_patient(&self.conn, patient_id),
        )
    }

    pub fn get_prescriptions_by_patient_name(&self, name: &str) -> Vec<PrescriptionListing> {
        listed(
            "get_prescriptions_by_patient_name",
            db::get_prescriptions_by_patient_name(&self.conn, name),
        )
    }

    pub fn filter_prescriptions(&self, filter: &PrescriptionFilter) -> Vec<PrescriptionListing> {
        listed("filter_prescriptions", db::filter_prescriptions(&self.conn, filter))
    }

    /// Rewrites the header and replaces every item.
    pub fn update_prescription(
        &self,
        prescription_id: &str,
        prescription: &Prescription,
        items: &[PrescriptionItem],
    ) -> bool {
        succeeded(
            "update_prescription",
            prescription_id,
            db::update_prescription(&self.conn, prescription_id, prescription, items),
        )
    }

    pub fn get_prescribed_medicine_names(&self) -> Vec<String> {
        listed(
            "get_prescribed_medicine_names",
            db::get_prescribed_medicine_names(&self.conn),
        )
    }

    // ── Billing ─────────────────────────────────────────────────────────

    pub fn add_bill(&self, bill: &Bill) -> bool {
        succeeded("add_bill", &bill.bill_id, db::insert_bill(&self.conn, bill))
    }

    pub fn get_bill_by_id(&self, bill_id: &str) -> Option<BillListing> {
        found("get_bill_by_id", bill_id, db::get_bill(&self.conn, bill_id))
    }

    pub fn get_all_bills(&self) -> Vec<BillListing> {
        listed("get_all_bills", db::get_all_bills(&self.conn))
    }

    pub fn get_bills_by_patient_id(&self, patient_id: &str) -> Vec<BillListing> {
        listed("get_bills_by_patient_id", db::get_bills_by_patient_id(&self.conn, patient_id))
    }

    pub fn get_bills_by_date(&self, date: NaiveDate) -> Vec<BillListing> {
        listed("get_bills_by_date", db::get_bills_by_date(&self.conn, date))
    }

    pub fn get_bills_by_status(&self, status: PaymentStatus) -> Vec<BillListing> {
        listed("get_bills_by_status", db::get_bills_by_status(&self.conn, status))
    }

    pub fn get_bills_by_patient_name(&self, name: &str) -> Vec<BillListing> {
        listed("get_bills_by_patient_name", db::get_bills_by_patient_name(&self.conn, name))
    }

    pub fn filter_bills(&self, filter: &BillFilter) -> Vec<BillListing> {
        listed("filter_bills", db::filter_bills(&self.conn, filter))
    }

    pub fn update_bill(&self, bill_id: &str, bill: &Bill) -> bool {
        succeeded("update_bill", bill_id, db::update_bill(&self.conn, bill_id, bill))
    }

    pub fn set_payment_status(&self, bill_id: &str, status: PaymentStatus, payment_method: Option<&str>) -> bool {
        succeeded(
            "set_payment_status",
            bill_id,
            db::set_payment_status(&self.conn, bill_id, status, payment_method),
        )
    }

    pub fn delete_bill(&self, bill_id: &str) -> bool {
        succeeded("delete_bill", bill_id, db::delete_bill(&self.conn, bill_id))
    }

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Dashboard counters; all zero when the window is empty or invalid.
    pub fn get_statistics(&self, window: StatsWindow) -> Statistics {
        match db::get_statistics(&self.conn, window) {
            Ok(stats) => stats,
            Err(e) => {
                report("get_statistics", &format!("{window:?}"), &e);
                Statistics::default()
            }
        }
    }

    pub fn get_daily_statistics(&self, date: NaiveDate) -> Statistics {
        self.get_statistics(StatsWindow::Day(date))
    }

    pub fn get_monthly_statistics(&self, year: i32, month: u32) -> Statistics {
        self.get_statistics(StatsWindow::Month { year, month })
    }

    pub fn get_yearly_statistics(&self, year: i32) -> Statistics {
        self.get_statistics(StatsWindow::Year(year))
    }

    pub fn get_date_range_statistics(&self, from: NaiveDate, to: NaiveDate) -> Statistics {
        self.get_statistics(StatsWindow::Range { from, to })
    }

    pub fn get_recent_activities(&self, limit: usize) -> Vec<Activity> {
        listed("get_recent_activities", db::get_recent_activities(&self.conn, limit))
    }

    // ── Medicine catalog ────────────────────────────────────────────────

    /// Rows added; zero when the catalog already had entries.
    pub fn seed_medicine_catalog(&self) -> usize {
        counted("seed_medicine_catalog", db::seed_medicine_catalog(&self.conn))
    }

    /// False when the entry is already listed or invalid.
    pub fn add_medicine_to_master(&self, medicine: &Medicine) -> bool {
        match db::insert_medicine(&self.conn, medicine) {
            Ok(added) => added,
            Err(e) => {
                report("add_medicine_to_master", &medicine.medicine_name, &e);
                false
            }
        }
    }

    /// New rows added. An invalid entry or engine error adds none.
    pub fn batch_add_medicines(&self, medicines: &[Medicine]) -> usize {
        counted("batch_add_medicines", db::insert_medicines(&self.conn, medicines))
    }

    pub fn get_all_medicines_master(&self) -> Vec<StoredMedicine> {
        listed("get_all_medicines_master", db::get_all_medicines(&self.conn))
    }

    pub fn search_medicines_master(&self, query: &str) -> Vec<StoredMedicine> {
        listed("search_medicines_master", db::search_medicines(&self.conn, query))
    }

    pub fn get_all_medicines_master_paginated(&self, limit: usize, offset: usize) -> Vec<StoredMedicine> {
        listed(
            "get_all_medicines_master_paginated",
            db::get_medicines_page(&self.conn, Some(limit), offset),
        )
    }

    pub fn search_medicines_master_paginated(&self, query: &str, limit: usize, offset: usize) -> Vec<StoredMedicine> {
        listed(
            "search_medicines_master_paginated",
            db::search_medicines_page(&self.conn, query, Some(limit), offset),
        )
    }

    pub fn count_medicines_master(&self) -> i64 {
        counted("count_medicines_master", db::count_medicines(&self.conn))
    }

    pub fn count_search_medicines(&self, query: &str) -> i64 {
        counted("count_search_medicines", db::count_search_medicines(&self.conn, query))
    }

    pub fn get_medicine_dosages(&self, medicine_name: &str) -> Vec<String> {
        listed("get_medicine_dosages", db::get_medicine_dosages(&self.conn, medicine_name))
    }

    pub fn get_medicine_by_name_and_dosage(&self, medicine_name: &str, dosage: Option<&str>) -> Option<StoredMedicine> {
        found(
            "get_medicine_by_name_and_dosage",
            medicine_name,
            db::get_medicine_by_name_and_dosage(&self.conn, medicine_name, dosage),
        )
    }

    // ── Users ───────────────────────────────────────────────────────────

    pub fn ensure_default_user(&self) -> bool {
        match db::ensure_default_user(&self.conn) {
            Ok(created) => created,
            Err(e) => {
                report("ensure_default_user", "admin", &e);
                false
            }
        }
    }

    /// New account id, or `None` when the username is held by an active
    /// account or the input is invalid.
    pub fn create_user(&self, user: &NewUser) -> Option<i64> {
        match db::create_user(&self.conn, user) {
            Ok(id) => {
                tracing::info!(username = %user.username, id, "User created");
                Some(id)
            }
            Err(e) => {
                report("create_user", &user.username, &e);
                None
            }
        }
    }

    pub fn authenticate_user(&self, username: &str, password: &str) -> Option<User> {
        let user = found(
            "authenticate_user",
            username,
            db::authenticate_user(&self.conn, username, password),
        );
        if user.is_none() {
            tracing::warn!(username, "Authentication failed");
        }
        user
    }

    pub fn get_user_by_id(&self, user_id: i64) -> Option<User> {
        found("get_user_by_id", &user_id.to_string(), db::get_user(&self.conn, user_id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        found(
            "get_user_by_username",
            username,
            db::get_user_by_username(&self.conn, username),
        )
    }

    pub fn get_all_users(&self) -> Vec<User> {
        listed("get_all_users", db::get_all_users(&self.conn))
    }

    pub fn update_user(&self, user_id: i64, update: &UserUpdate) -> bool {
        succeeded(
            "update_user",
            &user_id.to_string(),
            db::update_user(&self.conn, user_id, update),
        )
    }

    pub fn delete_user(&self, user_id: i64) -> bool {
        succeeded("delete_user", &user_id.to_string(), db::delete_user(&self.conn, user_id))
    }

    pub fn user_has_permission(&self, user_id: i64, module: AppModule) -> bool {
        match db::user_has_permission(&self.conn, user_id, module) {
            Ok(granted) => granted,
            Err(e) => {
                report("user_has_permission", &user_id.to_string(), &e);
                false
            }
        }
    }

    pub fn get_user_permissions(&self, user_id: i64) -> Vec<AppModule> {
        listed("get_user_permissions", db::get_user_permissions(&self.conn, user_id))
    }

    pub fn set_user_permissions(&self, user_id: i64, modules: &[AppModule]) -> bool {
        succeeded(
            "set_user_permissions",
            &user_id.to_string(),
            db::set_user_permissions(&self.conn, user_id, modules),
        )
    }

    // ── Backup ──────────────────────────────────────────────────────────

    pub fn create_backup(&self, dest: &Path) -> bool {
        succeeded(
            "create_backup",
            &dest.display().to_string(),
            db::backup_database(&self.conn, dest),
        )
    }

    /// Back up into `dir` under a timestamped file name, returning the file
    /// written.
    pub fn create_timestamped_backup(&self, dir: &Path) -> Option<PathBuf> {
        let dest = dir.join(config::backup_file_name(Local::now().naive_local()));
        self.create_backup(&dest).then_some(dest)
    }

    /// Replace the live contents with a backup. False, with the live data
    /// untouched, when `src` is missing or not a records database.
    pub fn restore_from_file(&mut self, src: &Path) -> bool {
        let restored = succeeded(
            "restore_from_file",
            &src.display().to_string(),
            db::restore_database(&mut self.conn, src),
        );
        if restored {
            if let Err(e) = self.seed() {
                report("restore_from_file", "seed", &e);
            }
        }
        restored
    }
}

fn is_expected(err: &DatabaseError) -> bool {
    err.is_unique_violation()
        || matches!(
            err,
            DatabaseError::NotFound { .. }
                | DatabaseError::InvalidTransition { .. }
                | DatabaseError::Validation { .. }
                | DatabaseError::ConstraintViolation(_)
        )
}

fn report(operation: &str, key: &str, err: &DatabaseError) {
    if is_expected(err) {
        tracing::warn!(operation, key, error = %err, "Operation rejected");
    } else {
        tracing::error!(operation, key, error = %err, "Operation failed");
    }
}

fn succeeded(operation: &str, key: &str, result: Result<(), DatabaseError>) -> bool {
    match result {
        Ok(()) => {
            tracing::info!(operation, key, "Operation succeeded");
            true
        }
        Err(e) => {
            report(operation, key, &e);
            false
        }
    }
}

fn found<T>(operation: &str, key: &str, result: Result<Option<T>, DatabaseError>) -> Option<T> {
    result.unwrap_or_else(|e| {
        report(operation, key, &e);
        None
    })
}

fn listed<T>(operation: &str, result: Result<Vec<T>, DatabaseError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        report(operation, "", &e);
        Vec::new()
    })
}

fn counted<T: Default>(operation: &str, result: Result<T, DatabaseError>) -> T {
    result.unwrap_or_else(|e| {
        report(operation, "", &e);
        T::default()
    })
}
