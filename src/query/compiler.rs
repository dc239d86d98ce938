use chrono::{Days, Local, NaiveDate};
use serde::Serialize;

use super::lexicon::{self, Lookback};
use super::types::QueryIntent;
use crate::config::{AGGREGATE_SOURCE_FIELD, DEFAULT_PRESET_LIMIT, RECENT_WINDOW_DAYS};
use crate::db::QueryParam;
use crate::models::{FilterCondition, Metric, RecordType, SortOrder};

pub const RECORDS_TABLE: &str = "health_records";

/// Column aliases in result rows.
pub mod columns {
    pub const RECORD_ID: &str = "RECORD_ID";
    pub const RECORD_CLASS: &str = "RECORD_CLASS";
    pub const RECORD_DATE: &str = "RECORD_DATE";
    pub const DATA_JSON: &str = "DATA_JSON";
    pub const PROVIDER_IDENTITY: &str = "PROVIDER_IDENTITY";
    pub const EXTRACTION_CONFIDENCE: &str = "EXTRACTION_CONFIDENCE";
    pub const RESULT_COUNT: &str = "RESULT_COUNT";
    pub const RESULT_AVERAGE: &str = "RESULT_AVERAGE";
    pub const RESULT_MAXIMUM: &str = "RESULT_MAXIMUM";
    pub const RESULT_MINIMUM: &str = "RESULT_MINIMUM";
    pub const RECORD_COUNT: &str = "RECORD_COUNT";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Average,
    Maximum,
    Minimum,
}

impl Aggregate {
    fn sql_fn(&self) -> &'static str {
        match self {
            Self::Average => "AVG",
            Self::Maximum => "MAX",
            Self::Minimum => "MIN",
        }
    }

    /// Result column carrying the aggregate value.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Average => columns::RESULT_AVERAGE,
            Self::Maximum => columns::RESULT_MAXIMUM,
            Self::Minimum => columns::RESULT_MINIMUM,
        }
    }

    fn from_metric(metric: Metric) -> Option<Self> {
        match metric {
            Metric::Average => Some(Self::Average),
            Metric::Maximum => Some(Self::Maximum),
            Metric::Minimum => Some(Self::Minimum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Count,
    Aggregate(Aggregate),
    /// date, payload, provider, confidence
    Records,
    /// date, payload, confidence
    Series,
    /// id, class, date, provider, payload, confidence
    Detail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    OwnerIs(i64),
    RecordClassIs(RecordType),
    /// Case-insensitive substring of the serialized payload
    PayloadContains(String),
    PayloadContainsAny(Vec<String>),
    /// Top-level payload field equals the value; undecodable payloads never match
    PayloadFieldEquals { field: String, value: String },
    PayloadFieldPresent(String),
    RecordDateOnOrAfter(NaiveDate),
    AnyOf(Vec<Predicate>),
}

/// Projection, filter and ordering for one record-store query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub projection: Projection,
    pub predicates: Vec<Predicate>,
    pub ordering: Option<SortOrder>,
    pub limit: Option<u32>,
}

/// Query text plus the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

/// Compile against the local calendar date.
pub fn compile(intent: &QueryIntent, owner_id: i64) -> QuerySpec {
    compile_at(intent, owner_id, Local::now().date_naive())
}

pub fn compile_at(intent: &QueryIntent, owner_id: i64, today: NaiveDate) -> QuerySpec {
    let projection = match intent.metric {
        Some(Metric::Count) => Projection::Count,
        Some(metric) => Aggregate::from_metric(metric)
            .map(Projection::Aggregate)
            .unwrap_or(Projection::Records),
        None => Projection::Records,
    };

    let mut predicates = vec![Predicate::OwnerIs(owner_id)];

    if let Some(record_type) = intent.record_type {
        predicates.push(Predicate::RecordClassIs(record_type));
    }

    if let Some(ref attribute) = intent.attribute {
        predicates.push(Predicate::PayloadContains(attribute.clone()));
    }

    match intent.filter_condition {
        Some(FilterCondition::Abnormal) => {
            predicates.push(Predicate::PayloadContains("abnormal".into()));
        }
        Some(FilterCondition::Active) => {
            predicates.push(Predicate::PayloadContainsAny(vec![
                "active".into(),
                "ongoing".into(),
            ]));
        }
        Some(FilterCondition::Recent) => {
            if let Some(cutoff) = days_before(today, RECENT_WINDOW_DAYS) {
                predicates.push(Predicate::RecordDateOnOrAfter(cutoff));
            }
        }
        None => {}
    }

    if let Some(Lookback::Days(days)) = intent
        .time_period
        .as_deref()
        .and_then(lexicon::lookback_for)
    {
        if let Some(cutoff) = days_before(today, days) {
            predicates.push(Predicate::RecordDateOnOrAfter(cutoff));
        }
    }

    let ordering = match projection {
        Projection::Records | Projection::Series | Projection::Detail => Some(intent.sort_order),
        Projection::Count | Projection::Aggregate(_) => None,
    };

    QuerySpec {
        projection,
        predicates,
        ordering,
        limit: None,
    }
}

/// `None` when the window reaches past the earliest representable date, in
/// which case the caller leaves the query unbounded.
pub(crate) fn days_before(today: NaiveDate, days: u32) -> Option<NaiveDate> {
    today.checked_sub_days(Days::new(u64::from(days)))
}

/// Fixed record listings that bypass free-text parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum PresetQuery {
    AllRecords,
    LabsRecent { limit: u32 },
    MedicationsActive,
    VitalsByType { vital_type: String },
    AbnormalLabs,
}

impl PresetQuery {
    pub fn labs_recent() -> Self {
        Self::LabsRecent {
            limit: DEFAULT_PRESET_LIMIT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AllRecords => "all_records",
            Self::LabsRecent { .. } => "labs_recent",
            Self::MedicationsActive => "medications_active",
            Self::VitalsByType { .. } => "vitals_by_type",
            Self::AbnormalLabs => "abnormal_labs",
        }
    }

    /// Newest-first listing for one owner.
    pub fn spec(&self, owner_id: i64) -> QuerySpec {
        let mut predicates = vec![Predicate::OwnerIs(owner_id)];
        let mut limit = None;

        match self {
            Self::AllRecords => {}
            Self::LabsRecent { limit: n } => {
                predicates.push(Predicate::RecordClassIs(RecordType::Lab));
                limit = Some(*n);
            }
            Self::MedicationsActive => {
                predicates.push(Predicate::RecordClassIs(RecordType::Medication));
                predicates.push(Predicate::AnyOf(vec![
                    Predicate::PayloadFieldEquals {
                        field: "status".into(),
                        value: "active".into(),
                    },
                    Predicate::PayloadContains("active".into()),
                ]));
            }
            Self::VitalsByType { vital_type } => {
                predicates.push(Predicate::RecordClassIs(RecordType::Vital));
                predicates.push(Predicate::PayloadFieldEquals {
                    field: "vital_type".into(),
                    value: vital_type.clone(),
                });
            }
            Self::AbnormalLabs => {
                predicates.push(Predicate::RecordClassIs(RecordType::Lab));
                predicates.push(Predicate::PayloadFieldPresent("abnormal_flag".into()));
            }
        }

        QuerySpec {
            projection: Projection::Detail,
            predicates,
            ordering: Some(SortOrder::Desc),
            limit,
        }
    }
}

impl QuerySpec {
    /// Render to SQLite text. Every caller-derived value is bound, never spliced.
    pub fn render(&self) -> CompiledQuery {
        let mut params: Vec<QueryParam> = Vec::new();

        let clauses: Vec<String> = self
            .predicates
            .iter()
            .map(|predicate| predicate_clause(&mut params, predicate))
            .collect();

        let mut parts = vec![
            select_clause(self.projection),
            format!("FROM {RECORDS_TABLE}"),
        ];
        if !clauses.is_empty() {
            parts.push(format!("WHERE {}", clauses.join(" AND ")));
        }
        if let Some(order) = self.ordering {
            parts.push(format!("ORDER BY record_date {}", order.as_str()));
        }
        if let Some(limit) = self.limit {
            params.push(QueryParam::Integer(i64::from(limit)));
            parts.push(format!("LIMIT ?{}", params.len()));
        }

        CompiledQuery {
            sql: parts.join("\n"),
            params,
        }
    }
}

fn predicate_clause(params: &mut Vec<QueryParam>, predicate: &Predicate) -> String {
    match predicate {
        Predicate::OwnerIs(id) => {
            params.push(QueryParam::Integer(*id));
            format!("owner_id = ?{}", params.len())
        }
        Predicate::RecordClassIs(record_type) => {
            params.push(QueryParam::Text(record_type.as_str().to_string()));
            format!("record_class = ?{}", params.len())
        }
        Predicate::PayloadContains(needle) => contains_clause(params, needle),
        Predicate::PayloadContainsAny(needles) => {
            let alternatives: Vec<String> = needles
                .iter()
                .map(|needle| contains_clause(params, needle))
                .collect();
            format!("({})", alternatives.join(" OR "))
        }
        Predicate::PayloadFieldEquals { field, value } => {
            let extracted = field_clause(params, field);
            params.push(QueryParam::Text(value.clone()));
            format!("{extracted} = ?{}", params.len())
        }
        Predicate::PayloadFieldPresent(field) => {
            format!("{} IS NOT NULL", field_clause(params, field))
        }
        Predicate::RecordDateOnOrAfter(date) => {
            params.push(QueryParam::Text(date.format("%Y-%m-%d").to_string()));
            format!("record_date >= ?{}", params.len())
        }
        Predicate::AnyOf(alternatives) => {
            let rendered: Vec<String> = alternatives
                .iter()
                .map(|alternative| predicate_clause(params, alternative))
                .collect();
            format!("({})", rendered.join(" OR "))
        }
    }
}

fn field_clause(params: &mut Vec<QueryParam>, field: &str) -> String {
    params.push(QueryParam::Text(format!("$.{field}")));
    format!(
        "(CASE WHEN json_valid(data_json) THEN json_extract(data_json, ?{}) END)",
        params.len()
    )
}

fn contains_clause(params: &mut Vec<QueryParam>, needle: &str) -> String {
    params.push(QueryParam::Text(needle.to_string()));
    format!("instr(lower(data_json), lower(?{})) > 0", params.len())
}

fn select_clause(projection: Projection) -> String {
    match projection {
        Projection::Count => format!("SELECT COUNT(*) AS {}", columns::RESULT_COUNT),
        Projection::Aggregate(aggregate) => format!(
            "SELECT {}(numeric_prefix(CASE WHEN json_valid(data_json) \
             THEN json_extract(data_json, '$.{}') END)) AS {}, COUNT(*) AS {}",
            aggregate.sql_fn(),
            AGGREGATE_SOURCE_FIELD,
            aggregate.column(),
            columns::RECORD_COUNT,
        ),
        Projection::Records => format!(
            "SELECT record_date AS {}, data_json AS {}, provider_identity AS {}, \
             extraction_confidence AS {}",
            columns::RECORD_DATE,
            columns::DATA_JSON,
            columns::PROVIDER_IDENTITY,
            columns::EXTRACTION_CONFIDENCE,
        ),
        Projection::Series => format!(
            "SELECT record_date AS {}, data_json AS {}, extraction_confidence AS {}",
            columns::RECORD_DATE,
            columns::DATA_JSON,
            columns::EXTRACTION_CONFIDENCE,
        ),
        Projection::Detail => format!(
            "SELECT record_id AS {}, record_class AS {}, record_date AS {}, \
             provider_identity AS {}, data_json AS {}, extraction_confidence AS {}",
            columns::RECORD_ID,
            columns::RECORD_CLASS,
            columns::RECORD_DATE,
            columns::PROVIDER_IDENTITY,
            columns::DATA_JSON,
            columns::EXTRACTION_CONFIDENCE,
        ),
    }
}
