use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::RecordType;

/// A typed health record as handed to the store for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRecord {
    pub record_class: RecordType,
    pub record_date: NaiveDate,
    #[serde(default)]
    pub provider_identity: Option<String>,
    /// Structured payload, shape depends on `record_class`
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub source_document: Option<String>,
    #[serde(default)]
    pub extraction_confidence: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub owner_id: i64,
    pub records_inserted: usize,
    pub records_failed: usize,
    pub record_types: BTreeMap<String, usize>,
}
