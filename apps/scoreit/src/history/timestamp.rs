//! History timestamps arrive in three encodings:
//! - a plain number or string (`1700000000000`, `"1700000000000"`, `"2024-05-01T10:00:00Z"`)
//! - a wrapped date `{"$date": <number | string>}`
//! - a wrapped long `{"$date": {"$numberLong": "<digits>"}}`
//!
//! All reduce to epoch milliseconds, or `None` when unparsable.

use std::cmp::Ordering;

use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use crate::models::history::HistoryEntry;

pub fn normalize_timestamp(raw: &Value) -> Option<i64> {
    match raw {
        Value::Object(map) => match map.get("$date")? {
            Value::Object(inner) => inner.get("$numberLong").and_then(scalar_epoch_millis),
            scalar => scalar_epoch_millis(scalar),
        },
        scalar => scalar_epoch_millis(scalar),
    }
}

fn scalar_epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(millis) = s.parse::<i64>() {
                return Some(millis);
            }
            if let Ok(millis) = s.parse::<f64>() {
                return millis.is_finite().then_some(millis as i64);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.timestamp_millis())
        }
        _ => None,
    }
}

/// Newest first. Unparsable timestamps always sink to the end; ties keep input order.
pub fn compare_newest_first(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_newest_first(entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut keyed: Vec<(Option<i64>, HistoryEntry)> = entries
        .into_iter()
        .map(|entry| (entry.epoch_millis(), entry))
        .collect();
    // `sort_by` is stable, so equal keys keep backend order.
    keyed.sort_by(|(a, _), (b, _)| compare_newest_first(*a, *b));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

/// Local-time label for a raw timestamp, e.g. `2024-05-01  09:05 AM`.
pub fn display_date(raw: &Value) -> String {
    if raw.is_null() {
        return "No date".to_string();
    }
    normalize_timestamp(raw)
        .and_then(|millis| Local.timestamp_millis_opt(millis).single())
        .map(|dt| dt.format("%Y-%m-%d  %I:%M %p").to_string())
        .unwrap_or_else(|| "Invalid date".to_string())
}

impl HistoryEntry {
    pub fn epoch_millis(&self) -> Option<i64> {
        normalize_timestamp(&self.timestamp)
    }

    pub fn display_date(&self) -> String {
        display_date(&self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, timestamp: Value) -> HistoryEntry {
        serde_json::from_value(json!({"_id": id, "timestamp": timestamp})).unwrap()
    }

    #[test]
    fn test_three_encodings_and_unparsable() {
        let raw = [
            json!(100),
            json!({"$date": 50}),
            json!({"$date": {"$numberLong": "200"}}),
            json!({"unexpected": true}),
        ];
        let normalized: Vec<Option<i64>> = raw.iter().map(normalize_timestamp).collect();
        assert_eq!(normalized, vec![Some(100), Some(50), Some(200), None]);
    }

    #[test]
    fn test_sort_sinks_unparsable_to_end() {
        let entries = vec![
            entry("plain", json!(100)),
            entry("wrapped", json!({"$date": 50})),
            entry("long", json!({"$date": {"$numberLong": "200"}})),
            entry("junk", json!("not a date")),
        ];
        let ids: Vec<String> = sort_newest_first(entries)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["long", "plain", "wrapped", "junk"]);
    }

    #[test]
    fn test_unparsable_sinks_even_when_first() {
        let entries = vec![
            entry("junk-1", Value::Null),
            entry("a", json!(1)),
            entry("junk-2", json!([1, 2])),
            entry("b", json!(2)),
        ];
        let ids: Vec<String> = sort_newest_first(entries)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "junk-1", "junk-2"]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let entries = vec![entry("first", json!(5)), entry("second", json!("5"))];
        let ids: Vec<String> = sort_newest_first(entries)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_string_encodings() {
        assert_eq!(normalize_timestamp(&json!("1700000000000")), Some(1_700_000_000_000));
        assert_eq!(normalize_timestamp(&json!({"$date": "42"})), Some(42));
        assert_eq!(
            normalize_timestamp(&json!("1970-01-01T00:00:01Z")),
            Some(1000)
        );
        assert_eq!(
            normalize_timestamp(&json!({"$date": {"$numberLong": 7}})),
            Some(7)
        );
        assert_eq!(normalize_timestamp(&json!("")), None);
    }

    #[test]
    fn test_display_date_fallbacks() {
        assert_eq!(display_date(&Value::Null), "No date");
        assert_eq!(display_date(&json!("yesterday")), "Invalid date");
        assert_ne!(display_date(&json!(1_700_000_000_000i64)), "Invalid date");
    }
}
