//! Free-text health questions → parameterized record-store queries → insights.
//!
//! `intent` reads the question against the ordered `lexicon` tables, `compiler`
//! turns the intent into a bound query, `interpret` turns rows back into
//! insights. `trend` is a separate path that pulls a numeric series for one
//! attribute. `engine` wires these to a `RecordStore`.

pub mod types;
pub mod lexicon;
pub mod numeric;
pub mod intent;
pub mod compiler;
pub mod interpret;
pub mod trend;
pub mod engine;

pub use compiler::{compile, compile_at, CompiledQuery, PresetQuery, QuerySpec};
pub use engine::QueryEngine;
pub use intent::parse_intent;
pub use interpret::interpret_results;
pub use types::*;

use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Owner not found: {0}")]
    OwnerNotFound(String),

    #[error("Owner lookup failed: {0}")]
    OwnerLookup(#[source] StoreError),

    #[error("Query execution failed: {source}")]
    Execution {
        sql: String,
        #[source]
        source: StoreError,
    },
}

impl QueryError {
    /// Query text that was attempted, when the failure happened at execution.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
