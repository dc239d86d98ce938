use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use super::StoreError;
use crate::models::{HealthRecord, ImportSummary};

// ═══════════════════════════════════════════
// Owners
// ═══════════════════════════════════════════

pub fn get_owner_id(conn: &Connection, identity: &str) -> Result<Option<i64>, StoreError> {
    let id = conn
        .query_row(
            "SELECT owner_id FROM owners WHERE owner_identity = ?1",
            params![identity],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id)
}

/// Returns the existing owner id, creating the owner on first sight.
pub fn create_or_get_owner(conn: &Connection, identity: &str) -> Result<i64, StoreError> {
    if let Some(id) = get_owner_id(conn, identity)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO owners (owner_identity) VALUES (?1)",
        params![identity],
    )?;
    Ok(conn.last_insert_rowid())
}

// ═══════════════════════════════════════════
// Health records
// ═══════════════════════════════════════════

pub fn insert_record(
    conn: &Connection,
    owner_id: i64,
    record: &HealthRecord,
) -> Result<i64, StoreError> {
    if let Some(confidence) = record.extraction_confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(StoreError::ConstraintViolation(format!(
                "extraction_confidence {confidence} outside 0.0..=1.0"
            )));
        }
    }

    let data_json = serde_json::to_string(&record.data)?;
    conn.execute(
        "INSERT INTO health_records (owner_id, record_class, record_date, provider_identity,
         data_json, source_document, extraction_confidence, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            owner_id,
            record.record_class.as_str(),
            record.record_date.format("%Y-%m-%d").to_string(),
            record.provider_identity,
            data_json,
            record.source_document,
            record.extraction_confidence,
            record.notes,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Import a batch for one owner. A record that fails to insert is counted
/// and skipped; the rest of the batch still lands.
pub fn import_records(
    conn: &Connection,
    owner_identity: &str,
    records: &[HealthRecord],
) -> Result<ImportSummary, StoreError> {
    let owner_id = create_or_get_owner(conn, owner_identity)?;

    let mut records_inserted = 0;
    let mut records_failed = 0;
    let mut record_types: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        match insert_record(conn, owner_id, record) {
            Ok(_) => {
                records_inserted += 1;
                *record_types
                    .entry(record.record_class.as_str().to_string())
                    .or_default() += 1;
            }
            Err(e) => {
                tracing::warn!(record_class = %record.record_class, "Record insert failed: {e}");
                records_failed += 1;
            }
        }
    }

    tracing::info!(owner_id, records_inserted, records_failed, "Imported health records");

    Ok(ImportSummary {
        owner_id,
        records_inserted,
        records_failed,
        record_types,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::RecordType;
    use chrono::NaiveDate;
    use serde_json::json;

    fn lab(date: &str, confidence: Option<f64>) -> HealthRecord {
        HealthRecord {
            record_class: RecordType::Lab,
            record_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            provider_identity: Some("Dr. Jane Smith".into()),
            data: json!({"test_name": "Glucose", "result_value": "105 mg/dL"})
                .as_object()
                .unwrap()
                .clone(),
            source_document: None,
            extraction_confidence: confidence,
            notes: None,
        }
    }

    #[test]
    fn unknown_owner_resolves_to_none() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_owner_id(&conn, "Nobody").unwrap(), None);
    }

    #[test]
    fn create_or_get_owner_is_stable() {
        let conn = open_memory_database().unwrap();
        let first = create_or_get_owner(&conn, "John Doe").unwrap();
        let second = create_or_get_owner(&conn, "John Doe").unwrap();
        assert_eq!(first, second);
        assert_eq!(get_owner_id(&conn, "John Doe").unwrap(), Some(first));
    }

    #[test]
    fn insert_record_stores_payload_as_json() {
        let conn = open_memory_database().unwrap();
        let owner = create_or_get_owner(&conn, "John Doe").unwrap();
        insert_record(&conn, owner, &lab("2026-02-10", Some(0.95))).unwrap();

        let (class, date, payload): (String, String, String) = conn
            .query_row(
                "SELECT record_class, record_date, data_json FROM health_records",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(class, "LAB");
        assert_eq!(date, "2026-02-10");
        let decoded: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded["result_value"], "105 mg/dL");
    }

    #[test]
    fn insert_rejects_out_of_range_confidence() {
        let conn = open_memory_database().unwrap();
        let owner = create_or_get_owner(&conn, "John Doe").unwrap();
        let result = insert_record(&conn, owner, &lab("2026-02-10", Some(1.5)));
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
    }

    #[test]
    fn import_counts_failures_without_aborting() {
        let conn = open_memory_database().unwrap();
        let records = vec![
            lab("2026-01-10", Some(0.9)),
            lab("2026-01-11", Some(7.0)),
            lab("2026-01-12", None),
        ];
        let summary = import_records(&conn, "John Doe", &records).unwrap();
        assert_eq!(summary.records_inserted, 2);
        assert_eq!(summary.records_failed, 1);
        assert_eq!(summary.record_types.get("LAB"), Some(&2));
    }
}
