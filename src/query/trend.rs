use chrono::NaiveDate;
use serde_json::Value;

use super::compiler::{columns, days_before, Predicate, Projection, QuerySpec};
use super::numeric::value_as_number;
use super::types::{TrendLabel, TrendPoint, TrendResult, TrendStatistics};
use crate::config::{TREND_SLOPE_THRESHOLD, TREND_VALUE_FIELDS};
use crate::db::Row;
use crate::models::SortOrder;

/// Oldest-first series of records mentioning `attribute` within the lookback.
pub fn trend_query(owner_id: i64, attribute: &str, lookback_days: u32, today: NaiveDate) -> QuerySpec {
    let mut predicates = vec![
        Predicate::OwnerIs(owner_id),
        Predicate::PayloadContains(attribute.to_string()),
    ];
    if let Some(cutoff) = days_before(today, lookback_days) {
        predicates.push(Predicate::RecordDateOnOrAfter(cutoff));
    }

    QuerySpec {
        projection: Projection::Series,
        predicates,
        ordering: Some(SortOrder::Asc),
        limit: None,
    }
}

/// Rows whose payload does not decode, or whose first value field is not
/// numeric, are dropped without error.
pub fn extract_points(rows: &[Row]) -> Vec<TrendPoint> {
    rows.iter().filter_map(point_from_row).collect()
}

fn point_from_row(row: &Row) -> Option<TrendPoint> {
    let payload = match row.get(columns::DATA_JSON)? {
        Value::String(text) => serde_json::from_str::<Value>(text).ok()?,
        other => other.clone(),
    };
    let fields = payload.as_object()?;

    let raw = TREND_VALUE_FIELDS
        .iter()
        .find_map(|key| fields.get(*key))?;
    let value = value_as_number(raw)?;

    let date = match row.get(columns::RECORD_DATE) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Unknown date".to_string(),
        Some(other) => other.to_string(),
    };

    Some(TrendPoint {
        date,
        value,
        raw_data: payload,
    })
}

/// Two-point slope heuristic over the series: `(last - first) / count`.
pub fn classify_trend(values: &[f64]) -> TrendLabel {
    let slope = match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 => (last - first) / values.len() as f64,
        _ => 0.0,
    };

    if slope > TREND_SLOPE_THRESHOLD {
        TrendLabel::Increasing
    } else if slope < -TREND_SLOPE_THRESHOLD {
        TrendLabel::Decreasing
    } else {
        TrendLabel::Stable
    }
}

/// Aggregate a series. `None` when no points survived extraction.
pub fn analyze_points(points: Vec<TrendPoint>) -> Option<TrendResult> {
    if points.is_empty() {
        return None;
    }

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let count = values.len();
    let average = values.iter().sum::<f64>() / count as f64;
    let minimum = values.iter().copied().fold(f64::INFINITY, f64::min);
    let maximum = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(TrendResult {
        statistics: TrendStatistics {
            count,
            average: (average * 100.0).round() / 100.0,
            minimum,
            maximum,
            trend: classify_trend(&values),
        },
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(date: &str, payload: &str) -> Row {
        json!({"RECORD_DATE": date, "DATA_JSON": payload, "EXTRACTION_CONFIDENCE": 0.9})
            .as_object()
            .unwrap()
            .clone()
    }

    fn point(value: f64) -> TrendPoint {
        TrendPoint {
            date: "2026-01-01".into(),
            value,
            raw_data: json!({"value": value}),
        }
    }

    #[test]
    fn query_is_ascending_with_bounds() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let spec = trend_query(3, "glucose", 90, today);
        assert_eq!(spec.ordering, Some(SortOrder::Asc));
        assert_eq!(
            spec.predicates[2],
            Predicate::RecordDateOnOrAfter(NaiveDate::from_ymd_opt(2026, 7, 21).unwrap())
        );
        let sql = spec.render().sql;
        assert!(sql.ends_with("ORDER BY record_date ASC"));
        assert!(!sql.contains("PROVIDER_IDENTITY"));
    }

    #[test]
    fn lookback_past_calendar_range_is_unbounded() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let spec = trend_query(3, "glucose", u32::MAX, today);
        assert_eq!(spec.predicates.len(), 2);
        assert!(!spec.render().sql.contains("record_date >="));
    }

    #[test]
    fn first_present_candidate_field_is_used() {
        let rows = vec![
            row("2026-01-01", r#"{"result_value": "98 mg/dL", "amount": 5}"#),
            row("2026-01-02", r#"{"value": 101, "result_value": "300 mg/dL"}"#),
            row("2026-01-03", r#"{"result": "  104 mg/dL"}"#),
        ];
        let values: Vec<f64> = extract_points(&rows).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![98.0, 101.0, 104.0]);
    }

    #[test]
    fn unparseable_rows_are_skipped() {
        let rows = vec![
            row("2026-01-01", "not json"),
            row("2026-01-02", r#"{"value": "pending", "result_value": "99"}"#),
            row("2026-01-03", r#"{"test_name": "Glucose"}"#),
            row("2026-01-04", r#"["value", 1]"#),
            row("2026-01-05", r#"{"value": "110 mg/dL"}"#),
        ];
        let points = extract_points(&rows);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, "2026-01-05");
        assert_eq!(points[0].raw_data, json!({"value": "110 mg/dL"}));
    }

    #[test]
    fn single_point_is_stable() {
        assert_eq!(classify_trend(&[140.0]), TrendLabel::Stable);
        let result = analyze_points(vec![point(140.0)]).unwrap();
        assert_eq!(result.statistics.trend, TrendLabel::Stable);
        assert_eq!(result.statistics.count, 1);
    }

    #[test]
    fn slope_thresholds() {
        // (103 - 100) / 2 = 1.5
        assert_eq!(classify_trend(&[100.0, 103.0]), TrendLabel::Increasing);
        // (100 - 103) / 2 = -1.5
        assert_eq!(classify_trend(&[103.0, 100.0]), TrendLabel::Decreasing);
        // (102 - 100) / 2 = 1.0, not above the threshold
        assert_eq!(classify_trend(&[100.0, 102.0]), TrendLabel::Stable);
        assert_eq!(classify_trend(&[102.0, 100.0]), TrendLabel::Stable);
        // middle values do not matter
        assert_eq!(classify_trend(&[100.0, 500.0, 100.0]), TrendLabel::Stable);
    }

    #[test]
    fn statistics_over_series() {
        // (98 - 95) / 3 = 1.0, not above the threshold
        let result = analyze_points(vec![point(95.0), point(110.0), point(98.0)]).unwrap();
        let stats = &result.statistics;
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average, 101.0);
        assert_eq!(stats.minimum, 95.0);
        assert_eq!(stats.maximum, 110.0);
        assert_eq!(stats.trend, TrendLabel::Stable);
        assert_eq!(result.points.len(), 3);
    }

    #[test]
    fn empty_series_has_no_result() {
        assert!(analyze_points(Vec::new()).is_none());
        assert_eq!(classify_trend(&[]), TrendLabel::Stable);
    }
}
