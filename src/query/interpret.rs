use serde_json::{json, Value};

use super::compiler::{columns, Aggregate};
use super::lexicon;
use super::types::{Insight, QueryIntent};
use crate::config::LIST_INSIGHT_LIMIT;
use crate::db::Row;
use crate::models::Metric;

/// Turn result rows back into human-readable insights.
pub fn interpret_results(intent: &QueryIntent, rows: &[Row]) -> Vec<Insight> {
    if rows.is_empty() {
        return vec![Insight::new(
            "No Results Found",
            "No records match your query criteria",
        )];
    }

    match intent.metric {
        Some(Metric::Count) => vec![count_insight(intent, &rows[0])],
        Some(metric) if metric.is_numeric_aggregate() => {
            vec![aggregate_insight(intent, metric, &rows[0])]
        }
        _ => list_insights(intent, rows),
    }
}

fn count_insight(intent: &QueryIntent, row: &Row) -> Insight {
    let subject = intent
        .record_type
        .map(|rt| format!("{} ", rt.as_str().to_lowercase()))
        .unwrap_or_default();
    let mut title = format!("Total {subject}records");
    if let Some(ref period) = intent.time_period {
        title.push_str(&format!(" ({period})"));
    }

    let count = row.get(columns::RESULT_COUNT).cloned().unwrap_or(json!(0));
    Insight::new(title, count)
        .with_unit(Some("records"))
        .with_record_count(1)
}

fn aggregate_insight(intent: &QueryIntent, metric: Metric, row: &Row) -> Insight {
    let column = match metric {
        Metric::Maximum => Aggregate::Maximum.column(),
        Metric::Minimum => Aggregate::Minimum.column(),
        _ => Aggregate::Average.column(),
    };
    let subject = intent
        .attribute
        .clone()
        .or_else(|| intent.record_type.map(|rt| rt.as_str().to_lowercase()))
        .unwrap_or_else(|| "value".to_string());

    let value = row.get(column).map(round_fractional).unwrap_or(json!(0));
    let unit = intent.attribute.as_deref().and_then(lexicon::unit_for);

    Insight::new(format!("{} {}", metric.label(), subject), value)
        .with_unit(unit)
        .with_record_count(1)
}

fn list_insights(intent: &QueryIntent, rows: &[Row]) -> Vec<Insight> {
    let label = intent
        .record_type
        .map(|rt| rt.as_str())
        .unwrap_or("Record");

    let mut insights: Vec<Insight> = rows
        .iter()
        .take(LIST_INSIGHT_LIMIT)
        .map(|row| {
            let date = text_or(row, columns::RECORD_DATE, "Unknown date");
            let provider = text_or(row, columns::PROVIDER_IDENTITY, "Unknown provider");
            let confidence = text_or(row, columns::EXTRACTION_CONFIDENCE, "Unknown");

            Insight::new(format!("{label} on {date}"), decode_payload(row.get(columns::DATA_JSON)))
                .with_interpretation(format!("Provider: {provider}, Confidence: {confidence}"))
                .with_record_count(1)
        })
        .collect();

    if rows.len() > LIST_INSIGHT_LIMIT {
        let remaining = rows.len() - LIST_INSIGHT_LIMIT;
        insights.push(
            Insight::new(
                "Additional Records",
                format!("Plus {remaining} more records not shown"),
            )
            .with_record_count(remaining as u64),
        );
    }

    insights
}

/// Decode a stored payload; undecodable text comes back as `{"raw": text}`.
pub(crate) fn decode_payload(value: Option<&Value>) -> Value {
    match value {
        Some(Value::String(text)) => {
            serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
        }
        Some(Value::Null) | None => json!({}),
        Some(other) => other.clone(),
    }
}

/// Fractional numbers round to 2 decimals; anything else passes through.
fn round_fractional(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| json!((f * 100.0).round() / 100.0))
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn text_or(row: &Row, column: &str, fallback: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}
