use rusqlite::{params, Connection, OptionalExtension, Row};

use super::like_pattern;
use crate::db::DatabaseError;
use crate::models::*;

/// Starter catalog: (name, company, category, dosage, form, pediatric).
const CATALOG_SEED: &[(&str, &str, &str, &str, &str, bool)] = &[
    ("Paracetamol", "Dolo", "Pain & Fever", "650mg", "Tablet", false),
    ("Paracetamol", "Calpol", "Pain & Fever", "500mg", "Tablet", false),
    ("Paracetamol", "Calpol", "Pain & Fever", "250mg/5ml", "Syrup", true),
    ("Ibuprofen", "Brufen", "Pain & Fever", "400mg", "Tablet", false),
    ("Ibuprofen", "Ibugesic", "Pain & Fever", "100mg/5ml", "Suspension", true),
    ("Aspirin", "Ecosprin", "Pain & Fever", "75mg", "Tablet", false),
    ("Diclofenac", "Voveran", "Pain & Fever", "50mg", "Tablet", false),
    ("Pantoprazole", "Pantocid", "Acidity", "40mg", "Tablet", false),
    ("Omeprazole", "Omez", "Acidity", "20mg", "Capsule", false),
    ("Domperidone", "Domstal", "Nausea", "10mg", "Tablet", false),
    ("ORS", "Electral", "Rehydration", "21g Sachet", "Powder", true),
    ("Cetirizine", "Cetzine", "Allergy", "10mg", "Tablet", false),
    ("Cetirizine", "Cetzine", "Allergy", "5mg/5ml", "Syrup", true),
    ("Levocetirizine", "Levocet", "Allergy", "5mg", "Tablet", false),
    ("Ambroxol", "Mucosolvan", "Cough", "30mg/5ml", "Syrup", true),
    ("Vitamin C", "Limcee", "Vitamin", "500mg", "Tablet", false),
    ("Vitamin D3", "D-Rise", "Vitamin", "60k IU", "Capsule", false),
    ("Iron+Folic Acid", "Fefol", "Supplement", "100mg/1mg", "Tablet", false),
    ("Amoxicillin+Clavulanic Acid", "Augmentin", "Antibiotic", "625mg", "Tablet", false),
    ("Amoxicillin", "Mox", "Antibiotic", "500mg", "Capsule", false),
    ("Amoxicillin", "Mox Kid", "Antibiotic", "250mg/5ml", "Syrup", true),
    ("Cefixime", "Taxim-O", "Antibiotic", "200mg", "Tablet", false),
    ("Azithromycin", "Azithral", "Antibiotic", "500mg", "Tablet", false),
    ("Ciprofloxacin", "Cifran", "Antibiotic", "500mg", "Tablet", false),
    ("Metronidazole", "Flagyl", "Antibiotic", "400mg", "Tablet", false),
    ("Ceftriaxone", "Monocef", "Antibiotic", "1g", "Injection", false),
    ("Fluconazole", "Flucos", "Antifungal", "150mg", "Tablet", false),
    ("Acyclovir", "Zovirax", "Antiviral", "400mg", "Tablet", false),
    ("Amlodipine", "Amlong", "Hypertension", "5mg", "Tablet", false),
    ("Telmisartan", "Telma", "Hypertension", "40mg", "Tablet", false),
    ("Losartan", "Losar", "Hypertension", "50mg", "Tablet", false),
    ("Atorvastatin", "Atorva", "Cholesterol", "10mg", "Tablet", false),
    ("Metformin", "Glycomet", "Diabetes", "500mg", "Tablet", false),
    ("Glimepiride", "Amaryl", "Diabetes", "2mg", "Tablet", false),
    ("Insulin Glargine", "Lantus", "Diabetes", "100IU/ml", "Injection", false),
    ("Levothyroxine", "Thyronorm", "Thyroid", "50mcg", "Tablet", false),
    ("Levothyroxine", "Thyronorm", "Thyroid", "100mcg", "Tablet", false),
    ("Salbutamol", "Asthalin", "Asthma", "100mcg", "Inhaler", false),
    ("Ondansetron", "Emeset", "Vomiting", "2mg/5ml", "Syrup", true),
    ("Albendazole", "Zentel", "Deworming", "200mg", "Chewable", true),
    ("Normal Saline", "NS", "IV Fluid", "500ml", "Infusion", false),
    ("Ringer's Lactate", "RL", "IV Fluid", "500ml", "Infusion", false),
];

const MEDICINE_COLUMNS: &str =
    "id, medicine_name, company_name, dosage_mg, dosage_form, category, description, is_pediatric";

const SEARCH_CONDITION: &str = "LOWER(medicine_name) LIKE LOWER(?1) ESCAPE '\\'
         OR LOWER(company_name) LIKE LOWER(?1) ESCAPE '\\'
         OR LOWER(category) LIKE LOWER(?1) ESCAPE '\\'
         OR LOWER(dosage_mg) LIKE LOWER(?1) ESCAPE '\\'";

fn seed_entries() -> impl Iterator<Item = Medicine> {
    CATALOG_SEED
        .iter()
        .map(|&(name, company, category, dosage, form, pediatric)| {
            let mut description = format!("{category} medication");
            if pediatric {
                description.push_str(" - Pediatric use");
            }
            Medicine {
                medicine_name: name.to_string(),
                company_name: company.to_string(),
                dosage_mg: dosage.to_string(),
                dosage_form: form.to_string(),
                category: category.to_string(),
                description,
                is_pediatric: pediatric,
            }
        })
}

/// Fill an empty catalog with the starter list. Returns how many rows were
/// added; an already populated catalog is left alone.
pub fn seed_medicine_catalog(conn: &Connection) -> Result<usize, DatabaseError> {
    let existing = count_medicines(conn)?;
    if existing > 0 {
        tracing::debug!(existing, "Medicine catalog already populated, skipping seed");
        return Ok(0);
    }
    let seed: Vec<Medicine> = seed_entries().collect();
    let added = insert_medicines(conn, &seed)?;
    tracing::info!(added, "Seeded medicine catalog");
    Ok(added)
}

/// Insert one catalog entry. `Ok(false)` means the same name, company,
/// dosage and form are already listed.
pub fn insert_medicine(conn: &Connection, medicine: &Medicine) -> Result<bool, DatabaseError> {
    medicine.validate()?;
    let rows = conn.execute(
        "INSERT OR IGNORE INTO medicines_master
         (medicine_name, company_name, dosage_mg, dosage_form, category, description, is_pediatric)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            medicine.medicine_name,
            medicine.company_name,
            medicine.dosage_mg,
            medicine.dosage_form,
            medicine.category,
            medicine.description,
            medicine.is_pediatric,
        ],
    )?;
    Ok(rows > 0)
}

/// Insert many entries in one transaction, skipping ones already listed.
/// Returns how many were new. Any invalid entry aborts the whole batch.
pub fn insert_medicines(conn: &Connection, medicines: &[Medicine]) -> Result<usize, DatabaseError> {
    for medicine in medicines {
        medicine.validate()?;
    }
    let tx = conn.unchecked_transaction()?;
    let mut added = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO medicines_master
             (medicine_name, company_name, dosage_mg, dosage_form, category, description, is_pediatric)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for medicine in medicines {
            added += stmt.execute(params![
                medicine.medicine_name,
                medicine.company_name,
                medicine.dosage_mg,
                medicine.dosage_form,
                medicine.category,
                medicine.description,
                medicine.is_pediatric,
            ])?;
        }
    }
    tx.commit()?;
    Ok(added)
}

pub fn get_all_medicines(conn: &Connection) -> Result<Vec<StoredMedicine>, DatabaseError> {
    get_medicines_page(conn, None, 0)
}

/// One page of the catalog in name order. `limit = None` returns the rest.
pub fn get_medicines_page(
    conn: &Connection,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<StoredMedicine>, DatabaseError> {
    let sql = format!(
        "SELECT {MEDICINE_COLUMNS} FROM medicines_master
         ORDER BY medicine_name COLLATE NOCASE, dosage_mg, id
         LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![sql_limit(limit), sql_offset(offset)], row_to_medicine)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn search_medicines(conn: &Connection, query: &str) -> Result<Vec<StoredMedicine>, DatabaseError> {
    search_medicines_page(conn, query, None, 0)
}

pub fn search_medicines_page(
    conn: &Connection,
    query: &str,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<StoredMedicine>, DatabaseError> {
    let sql = format!(
        "SELECT {MEDICINE_COLUMNS} FROM medicines_master
         WHERE {SEARCH_CONDITION}
         ORDER BY medicine_name COLLATE NOCASE, dosage_mg, id
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![like_pattern(query.trim()), sql_limit(limit), sql_offset(offset)],
        row_to_medicine,
    )?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn count_medicines(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM medicines_master", [], |row| row.get(0))?;
    Ok(count)
}

pub fn count_search_medicines(conn: &Connection, query: &str) -> Result<i64, DatabaseError> {
    let sql = format!("SELECT COUNT(*) FROM medicines_master WHERE {SEARCH_CONDITION}");
    let count = conn.query_row(&sql, params![like_pattern(query.trim())], |row| row.get(0))?;
    Ok(count)
}

/// Distinct non-empty dosages listed for an exact medicine name.
pub fn get_medicine_dosages(conn: &Connection, medicine_name: &str) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT dosage_mg FROM medicines_master
         WHERE medicine_name = ?1 AND dosage_mg != ''
         ORDER BY dosage_mg",
    )?;
    let rows = stmt.query_map(params![medicine_name], |row| row.get(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// First entry for a name, optionally pinned to one dosage.
pub fn get_medicine_by_name_and_dosage(
    conn: &Connection,
    medicine_name: &str,
    dosage: Option<&str>,
) -> Result<Option<StoredMedicine>, DatabaseError> {
    let sql = format!(
        "SELECT {MEDICINE_COLUMNS} FROM medicines_master
         WHERE medicine_name = ?1 AND (?2 IS NULL OR dosage_mg = ?2)
         ORDER BY id LIMIT 1"
    );
    conn.query_row(&sql, params![medicine_name, dosage], row_to_medicine)
        .optional()
        .map_err(DatabaseError::from)
}

// SQLite reads a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

fn sql_offset(offset: usize) -> i64 {
    i64::try_from(offset).unwrap_or(i64::MAX)
}

fn row_to_medicine(row: &Row<'_>) -> rusqlite::Result<StoredMedicine> {
    Ok(StoredMedicine {
        id: row.get(0)?,
        medicine: Medicine {
            medicine_name: row.get(1)?,
            company_name: row.get(2)?,
            dosage_mg: row.get(3)?,
            dosage_form: row.get(4)?,
            category: row.get(5)?,
            description: row.get(6)?,
            is_pediatric: row.get(7)?,
        },
    })
}
