use chrono::{Local, NaiveDate};

use super::compiler::{compile_at, PresetQuery};
use super::intent::parse_intent;
use super::interpret::interpret_results;
use super::trend::{analyze_points, extract_points, trend_query};
use super::types::*;
use super::QueryError;
use crate::db::RecordStore;

/// Caller-facing surface: question in, structured result out.
///
/// Synchronous and single-pass. Failures come back as `success: false`
/// results rather than errors, and nothing is retried.
pub struct QueryEngine<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Answer a free-text question about `owner_identity`'s records.
    pub fn query(&self, owner_identity: &str, text: &str) -> QueryResponse {
        self.query_at(owner_identity, text, Local::now().date_naive())
    }

    pub fn query_at(&self, owner_identity: &str, text: &str, today: NaiveDate) -> QueryResponse {
        let owner_id = match self.resolve_owner(owner_identity) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(owner = owner_identity, "{e}");
                return QueryResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: Some(text.to_string()),
                    intent: None,
                    sql: None,
                });
            }
        };

        let intent = parse_intent(text);
        tracing::debug!(?intent, "Parsed query intent");

        let compiled = compile_at(&intent, owner_id, today).render();
        tracing::debug!(sql = %compiled.sql, params = compiled.params.len(), "Compiled query");

        let rows = match self.store.execute(&compiled.sql, &compiled.params) {
            Ok(rows) => rows,
            Err(source) => {
                let e = QueryError::Execution {
                    sql: compiled.sql,
                    source,
                };
                tracing::warn!(query = text, "{e}");
                return QueryResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: Some(text.to_string()),
                    intent: Some(IntentSummary::from(&intent)),
                    sql: e.sql().map(String::from),
                });
            }
        };

        let insights = interpret_results(&intent, &rows);
        tracing::info!(
            owner_id,
            rows = rows.len(),
            insights = insights.len(),
            "Answered health query"
        );

        QueryResponse::Success(QuerySuccess {
            success: true,
            query: text.to_string(),
            intent: IntentSummary::from(&intent),
            sql: compiled.sql,
            record_count: rows.len(),
            raw_results: rows,
            insights,
        })
    }

    /// Numeric series and trend statistics for `attribute` over `days`.
    pub fn get_trend(&self, owner_identity: &str, attribute: &str, days: u32) -> TrendResponse {
        self.get_trend_at(owner_identity, attribute, days, Local::now().date_naive())
    }

    pub fn get_trend_at(
        &self,
        owner_identity: &str,
        attribute: &str,
        days: u32,
        today: NaiveDate,
    ) -> TrendResponse {
        let owner_id = match self.resolve_owner(owner_identity) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(owner = owner_identity, "{e}");
                return TrendResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: None,
                    intent: None,
                    sql: None,
                });
            }
        };

        let compiled = trend_query(owner_id, attribute, days, today).render();
        let rows = match self.store.execute(&compiled.sql, &compiled.params) {
            Ok(rows) => rows,
            Err(source) => {
                let e = QueryError::Execution {
                    sql: compiled.sql,
                    source,
                };
                tracing::warn!(attribute, "{e}");
                return TrendResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: None,
                    intent: None,
                    sql: e.sql().map(String::from),
                });
            }
        };

        let empty = |message: String| {
            TrendResponse::Success(TrendReport {
                success: true,
                attribute: attribute.to_string(),
                days,
                data_points: Vec::new(),
                statistics: None,
                message: Some(message),
            })
        };

        if rows.is_empty() {
            return empty(format!("No data found for {attribute}"));
        }

        match analyze_points(extract_points(&rows)) {
            Some(result) => {
                tracing::info!(
                    owner_id,
                    attribute,
                    points = result.statistics.count,
                    trend = ?result.statistics.trend,
                    "Computed trend"
                );
                TrendResponse::Success(TrendReport {
                    success: true,
                    attribute: attribute.to_string(),
                    days,
                    data_points: result.points,
                    statistics: Some(result.statistics),
                    message: None,
                })
            }
            None => empty("Could not extract numeric values".to_string()),
        }
    }

    /// Run one of the fixed listings for `owner_identity`.
    pub fn preset(&self, owner_identity: &str, preset: &PresetQuery) -> PresetResponse {
        let name = preset.name();
        let owner_id = match self.resolve_owner(owner_identity) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(owner = owner_identity, preset = name, "{e}");
                return PresetResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: Some(name.to_string()),
                    intent: None,
                    sql: None,
                });
            }
        };

        let compiled = preset.spec(owner_id).render();
        let records = match self.store.execute(&compiled.sql, &compiled.params) {
            Ok(rows) => rows,
            Err(source) => {
                let e = QueryError::Execution {
                    sql: compiled.sql,
                    source,
                };
                tracing::warn!(preset = name, "{e}");
                return PresetResponse::Failure(QueryFailure {
                    success: false,
                    error: e.to_string(),
                    query: Some(name.to_string()),
                    intent: None,
                    sql: e.sql().map(String::from),
                });
            }
        };

        tracing::info!(owner_id, preset = name, rows = records.len(), "Ran preset query");
        PresetResponse::Success(PresetReport {
            success: true,
            preset: name.to_string(),
            sql: compiled.sql,
            record_count: records.len(),
            records,
        })
    }

    fn resolve_owner(&self, identity: &str) -> Result<i64, QueryError> {
        self.store
            .resolve_owner_id(identity)
            .map_err(QueryError::OwnerLookup)?
            .ok_or_else(|| QueryError::OwnerNotFound(identity.to_string()))
    }
}
