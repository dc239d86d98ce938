use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::db::Row;
use crate::models::{FilterCondition, Metric, RecordType, SortOrder};

/// Structured reading of a free-text question. Every field is optional or
/// defaulted, so an unrecognized question is still a valid intent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryIntent {
    pub record_type: Option<RecordType>,
    pub metric: Option<Metric>,
    /// Canonical time phrase, e.g. "last year"
    pub time_period: Option<String>,
    /// Canonical attribute key, e.g. "glucose"
    pub attribute: Option<String>,
    pub filter_condition: Option<FilterCondition>,
    pub sort_order: SortOrder,
    pub raw_query: String,
}

/// Intent as reported back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub record_type: Option<RecordType>,
    pub metric: Option<Metric>,
    pub time_period: Option<String>,
    pub attribute: Option<String>,
    pub filter: Option<FilterCondition>,
}

impl From<&QueryIntent> for IntentSummary {
    fn from(intent: &QueryIntent) -> Self {
        Self {
            record_type: intent.record_type,
            metric: intent.metric,
            time_period: intent.time_period.clone(),
            attribute: intent.attribute.clone(),
            filter: intent.filter_condition,
        }
    }
}

/// One human-readable finding. Created per response, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub value: serde_json::Value,
    pub unit: Option<String>,
    pub interpretation: Option<String>,
    pub record_count: Option<u64>,
    pub timestamp: DateTime<Local>,
}

impl Insight {
    pub fn new(title: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            unit: None,
            interpretation: None,
            record_count: None,
            timestamp: Local::now(),
        }
    }

    pub fn with_unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.map(String::from);
        self
    }

    pub fn with_interpretation(mut self, interpretation: String) -> Self {
        self.interpretation = Some(interpretation);
        self
    }

    pub fn with_record_count(mut self, count: u64) -> Self {
        self.record_count = Some(count);
        self
    }
}

impl std::fmt::Display for Insight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match &self.unit {
            Some(unit) => write!(f, "{}: {} {}", self.title, value, unit),
            None => write!(f, "{}: {}", self.title, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
    pub raw_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStatistics {
    pub count: usize,
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
    pub trend: TrendLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub points: Vec<TrendPoint>,
    pub statistics: TrendStatistics,
}

/// Successful answer to a free-text question.
#[derive(Debug, Clone, Serialize)]
pub struct QuerySuccess {
    pub success: bool,
    pub query: String,
    pub intent: IntentSummary,
    pub sql: String,
    pub raw_results: Vec<Row>,
    pub insights: Vec<Insight>,
    pub record_count: usize,
}

/// Structured failure; never raised, always returned.
#[derive(Debug, Clone, Serialize)]
pub struct QueryFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Success(QuerySuccess),
    Failure(QueryFailure),
}

impl QueryResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Trend answer. An empty series is still a success and carries `message`.
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub success: bool,
    pub attribute: String,
    pub days: u32,
    pub data_points: Vec<TrendPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<TrendStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TrendResponse {
    Success(TrendReport),
    Failure(QueryFailure),
}

impl TrendResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Rows from a fixed listing, returned as stored.
#[derive(Debug, Clone, Serialize)]
pub struct PresetReport {
    pub success: bool,
    pub preset: String,
    pub sql: String,
    pub record_count: usize,
    pub records: Vec<Row>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PresetResponse {
    Success(PresetReport),
    Failure(QueryFailure),
}

impl PresetResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_intent_is_empty_and_descending() {
        let intent = QueryIntent::default();
        assert!(intent.record_type.is_none());
        assert!(intent.metric.is_none());
        assert_eq!(intent.sort_order, SortOrder::Desc);
    }

    #[test]
    fn insight_serializes_external_shape() {
        let insight = Insight::new("Average glucose", 107.33)
            .with_unit(Some("mg/dL"))
            .with_record_count(1);
        let value = serde_json::to_value(&insight).unwrap();
        for key in ["title", "value", "unit", "interpretation", "record_count", "timestamp"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["unit"], json!("mg/dL"));
        assert_eq!(value["interpretation"], serde_json::Value::Null);
    }

    #[test]
    fn insight_display_includes_unit() {
        let insight = Insight::new("Average glucose", 107.33).with_unit(Some("mg/dL"));
        assert_eq!(insight.to_string(), "Average glucose: 107.33 mg/dL");
        let plain = Insight::new("No Results Found", "nothing");
        assert_eq!(plain.to_string(), "No Results Found: nothing");
    }

    #[test]
    fn failure_omits_absent_sql() {
        let failure = QueryFailure {
            success: false,
            error: "Owner not found: Jane".into(),
            query: Some("how many labs".into()),
            intent: None,
            sql: None,
        };
        let value = serde_json::to_value(QueryResponse::Failure(failure)).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("sql").is_none());
    }

    #[test]
    fn trend_label_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TrendLabel::Increasing).unwrap(), "\"increasing\"");
    }
}
