//! Lenient decoding of upstream records.
//!
//! Upstream payloads arrive either as JSON text embedded in an envelope or as
//! an already structured value, and field names drift between releases. These
//! helpers never fail: anything unusable decodes to an empty collection or a
//! missing field.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::model::Coordinate;

static WKT_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"POINT\s*\(\s*(-?[0-9]+(?:\.[0-9]+)?)\s+(-?[0-9]+(?:\.[0-9]+)?)\s*\)")
        .expect("static regex")
});

/// Turns an extracted payload into a list of records.
///
/// Strings are decoded as JSON first. A bare object counts as a single
/// record, a `{"vehicles": [...]}`-style wrapper is not unwrapped here.
/// Decode failures are logged and yield an empty list.
pub fn decode_records(payload: Option<Value>) -> Vec<Value> {
    let value = match payload {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Vec::new();
            }
            match serde_json::from_str::<Value>(text) {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, "Payload is not valid JSON, using empty collection");
                    return Vec::new();
                }
            }
        }
        Some(v) => v,
    };

    match value {
        Value::Array(items) => items,
        Value::Object(_) => vec![value],
        other => {
            warn!(kind = kind_of(&other), "Payload is not a record list");
            Vec::new()
        }
    }
}

/// Returns the first non-empty string among `keys`, in order.
///
/// Numbers are rendered as text, since codes come back numeric from some
/// endpoints.
pub fn pick_str(record: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match record.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Returns the first numeric value among `keys`, accepting numeric strings.
pub fn pick_f64(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match record.get(*k)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
    .filter(|v| v.is_finite())
}

/// Parses a `POINT(lon lat)` well-known-text string.
pub fn parse_wkt_point(text: &str) -> Option<Coordinate> {
    let caps = WKT_POINT.captures(text)?;
    let lon = caps[1].parse::<f64>().ok()?;
    let lat = caps[2].parse::<f64>().ok()?;
    Some(Coordinate::new(lat, lon))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_json_text_payload() {
        let payload = Value::String(r#"[{"SHATKODU":"34"},{"SHATKODU":"34A"}]"#.into());
        let records = decode_records(Some(payload));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_decode_structured_payload() {
        let records = decode_records(Some(json!([{"a": 1}])));
        assert_eq!(records, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_decode_garbage_is_empty() {
        assert!(decode_records(Some(Value::String("<html>".into()))).is_empty());
        assert!(decode_records(Some(json!(42))).is_empty());
        assert!(decode_records(None).is_empty());
        assert!(decode_records(Some(Value::String("   ".into()))).is_empty());
    }

    #[test]
    fn test_pick_str_prefers_first_present_key() {
        let record = json!({"SHATKODU": "34", "SHPIETT": "OLD"});
        assert_eq!(pick_str(&record, &["SHATKODU", "SHPIETT"]).as_deref(), Some("34"));

        let record = json!({"SHATKODU": "", "SHPIETT": "OLD"});
        assert_eq!(pick_str(&record, &["SHATKODU", "SHPIETT"]).as_deref(), Some("OLD"));
    }

    #[test]
    fn test_pick_str_renders_numbers() {
        let record = json!({"SDURAKKODU": 301341});
        assert_eq!(pick_str(&record, &["SDURAKKODU"]).as_deref(), Some("301341"));
    }

    #[test]
    fn test_pick_f64_accepts_strings_and_rejects_junk() {
        let record = json!({"lat": "41.01", "lon": 28.9, "x": "abc"});
        assert_eq!(pick_f64(&record, &["lat"]), Some(41.01));
        assert_eq!(pick_f64(&record, &["lon"]), Some(28.9));
        assert_eq!(pick_f64(&record, &["x"]), None);
        assert_eq!(pick_f64(&record, &["missing"]), None);
    }

    #[test]
    fn test_parse_wkt_point() {
        let c = parse_wkt_point("POINT(28.98 41.015)").unwrap();
        assert_eq!(c.lon, 28.98);
        assert_eq!(c.lat, 41.015);

        let c = parse_wkt_point("POINT (29.1 40.9)").unwrap();
        assert_eq!((c.lon, c.lat), (29.1, 40.9));
    }

    #[test]
    fn test_parse_wkt_point_rejects_other_shapes() {
        assert!(parse_wkt_point("").is_none());
        assert!(parse_wkt_point("LINESTRING(1 2, 3 4)").is_none());
        assert!(parse_wkt_point("POINT(abc)").is_none());
    }
}
