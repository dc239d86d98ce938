use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use super::{QueryParam, RecordStore, Row, StoreError};
use crate::query::numeric::numeric_prefix;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    prepare_connection(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    prepare_connection(&conn)?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection) -> Result<(), StoreError> {
    configure_pragmas(conn)?;
    register_functions(conn)?;
    run_migrations(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;"
    )?;
    Ok(())
}

/// `numeric_prefix(text)` returns NULL when the leading token is not a number,
/// so AVG/MAX/MIN skip the row instead of failing the statement.
fn register_functions(conn: &Connection) -> Result<(), StoreError> {
    conn.create_scalar_function(
        "numeric_prefix",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let parsed = match ctx.get_raw(0) {
                ValueRef::Integer(i) => Some(i as f64),
                ValueRef::Real(r) => Some(r),
                ValueRef::Text(t) => numeric_prefix(&String::from_utf8_lossy(t)),
                ValueRef::Null | ValueRef::Blob(_) => None,
            };
            Ok(parsed)
        },
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| StoreError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

/// Record store backed by a single SQLite connection.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self { conn: open_database(path)? })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self { conn: open_memory_database()? })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl RecordStore for SqliteRecordStore {
    fn execute(&self, sql: &str, params: &[QueryParam]) -> Result<Vec<Row>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut mapped = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                mapped.insert(name.clone(), json_from_sql(row.get_ref(idx)?));
            }
            out.push(mapped);
        }
        Ok(out)
    }

    fn resolve_owner_id(&self, identity: &str) -> Result<Option<i64>, StoreError> {
        super::repository::get_owner_id(&self.conn, identity)
    }
}

fn json_from_sql(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + owners + health_records
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn numeric_prefix_function_parses_leading_token() {
        let conn = open_memory_database().unwrap();
        let value: Option<f64> = conn
            .query_row("SELECT numeric_prefix('98.5 mg/dL')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(value, Some(98.5));

        let missing: Option<f64> = conn
            .query_row("SELECT numeric_prefix('pending review')", [], |row| row.get(0))
            .unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn aggregate_skips_unparseable_values() {
        let conn = open_memory_database().unwrap();
        let avg: f64 = conn
            .query_row(
                "SELECT AVG(numeric_prefix(v)) FROM (
                    SELECT '100 mg/dL' AS v UNION ALL SELECT 'n/a' UNION ALL SELECT '110'
                 )",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(avg, 105.0);
    }

    #[test]
    fn execute_returns_column_keyed_rows() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let rows = store
            .execute(
                "SELECT ?1 AS NAME, ?2 AS SCORE, NULL AS EMPTY_COL",
                &[QueryParam::Text("alice".into()), QueryParam::Real(1.5)],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["NAME"], json!("alice"));
        assert_eq!(rows[0]["SCORE"], json!(1.5));
        assert_eq!(rows[0]["EMPTY_COL"], serde_json::Value::Null);
    }

    #[test]
    fn execute_surfaces_sql_errors() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let result = store.execute("SELECT * FROM no_such_table", &[]);
        assert!(matches!(result, Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn file_database_persists_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let store = SqliteRecordStore::open(&path).unwrap();
            assert_eq!(count_tables(store.connection()).unwrap(), 3);
        }
        let reopened = SqliteRecordStore::open(&path).unwrap();
        assert_eq!(count_tables(reopened.connection()).unwrap(), 3);
    }
}
