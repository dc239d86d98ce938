pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use rusqlite::types::{ToSql, ToSqlOutput};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One result row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A value bound to a positional placeholder at execution time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ToSql for QueryParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Integer(v) => v.to_sql(),
            Self::Real(v) => v.to_sql(),
            Self::Text(v) => v.to_sql(),
        }
    }
}

/// The record store the query core runs against.
///
/// Implementations own their connection; the core never pools or retries.
pub trait RecordStore {
    /// Execute `sql` with positional `params` and return every row.
    fn execute(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, StoreError>;

    /// Map an owner identity (name, MRN, ...) to its numeric id.
    fn resolve_owner_id(&self, identity: &str) -> Result<Option<i64>, StoreError>;
}
