//! Normalize raw alert records into canonical Alert models.
//!
//! The upstream source is adversarial: field devices drift between schema
//! revisions, so every accessor here degrades to a documented default
//! instead of erroring. `normalize` is a total function.

use serde_json::Value;

use crate::config::FeedConfig;
use crate::types::{Alert, Criticality, RawRecord, UNKNOWN_TIMESTAMP_MS};

/// Source field names for accelerometer magnitude, first usable match wins.
pub const ACCEL_FIELDS: [&str; 2] = ["accelMagG", "accelG"];
/// Source field names for gyroscope magnitude, first usable match wins.
pub const GYRO_FIELDS: [&str; 2] = ["gyroMagDps", "gyroMag"];

/// Normalize one raw record into a canonical Alert. Pure, no I/O, never fails.
pub fn normalize(id: &str, raw: &RawRecord, config: &FeedConfig) -> Alert {
  let severity = string_field(raw, "severity");
  let status = string_field(raw, "status");
  let criticality = Criticality::derive(severity.as_deref(), status.as_deref());

  Alert {
    id: id.to_string(),
    device_id: string_field(raw, "deviceId")
      .unwrap_or_else(|| config.device_placeholder.clone()),
    event: string_field(raw, "event").unwrap_or_else(|| config.event_placeholder.clone()),
    timestamp_ms: timestamp_ms(raw, config.seconds_cutoff_ms),
    accel_mag_g: first_numeric(raw, &ACCEL_FIELDS),
    gyro_mag_dps: first_numeric(raw, &GYRO_FIELDS),
    heart_rate: numeric_field(raw, "heartRate"),
    spo2: numeric_field(raw, "spo2"),
    gps_valid: truthy_field(raw, "gpsValid"),
    lat: numeric_field(raw, "lat"),
    lng: numeric_field(raw, "lng"),
    severity,
    status,
    criticality,
  }
}

/// Resolve the record timestamp to epoch milliseconds.
///
/// Prefers an explicit `timestampMs`. Falls back to the generic `timestamp`
/// field with a unit heuristic: values <= the cutoff are seconds (x1000),
/// larger values are already milliseconds. No timestamp field at all yields
/// the unknown sentinel.
fn timestamp_ms(raw: &RawRecord, seconds_cutoff_ms: i64) -> i64 {
  if let Some(ms) = numeric_field(raw, "timestampMs") {
    return ms as i64;
  }
  match numeric_field(raw, "timestamp") {
    Some(t) if t <= seconds_cutoff_ms as f64 => (t * 1000.0) as i64,
    Some(t) => t as i64,
    None => UNKNOWN_TIMESTAMP_MS,
  }
}

/// String field, trimmed; absent, empty, or non-string yields None.
fn string_field(raw: &RawRecord, name: &str) -> Option<String> {
  raw
    .get(name)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

/// Numeric field; accepts JSON numbers and numeric strings (devices send both).
fn numeric_field(raw: &RawRecord, name: &str) -> Option<f64> {
  match raw.get(name)? {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

/// First usable numeric value among the candidate field names, in order.
fn first_numeric(raw: &RawRecord, names: &[&str]) -> Option<f64> {
  names.iter().find_map(|name| numeric_field(raw, name))
}

/// Loose truthiness for flag fields: true, nonzero number, or "true".
fn truthy_field(raw: &RawRecord, name: &str) -> bool {
  match raw.get(name) {
    Some(Value::Bool(b)) => *b,
    Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
    Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(value: Value) -> RawRecord {
    value.as_object().cloned().unwrap()
  }

  fn normalize_default(value: Value) -> Alert {
    normalize("k1", &record(value), &FeedConfig::default())
  }

  #[test]
  fn explicit_millis_field_wins() {
    let alert = normalize_default(json!({"timestampMs": 1234, "timestamp": 999}));
    assert_eq!(alert.timestamp_ms, 1234);
  }

  #[test]
  fn generic_timestamp_in_seconds_scales_up() {
    let alert = normalize_default(json!({"timestamp": 1_700_000_000i64}));
    assert_eq!(alert.timestamp_ms, 1_700_000_000_000);
  }

  #[test]
  fn generic_timestamp_in_millis_passes_through() {
    let alert = normalize_default(json!({"timestamp": 1_700_000_000_000i64}));
    assert_eq!(alert.timestamp_ms, 1_700_000_000_000);
  }

  #[test]
  fn unit_heuristic_boundary_is_inclusive() {
    // Exactly at the cutoff still counts as seconds.
    let at = normalize_default(json!({"timestamp": 1_000_000_000_000i64}));
    assert_eq!(at.timestamp_ms, 1_000_000_000_000_000);

    let above = normalize_default(json!({"timestamp": 1_000_000_000_001i64}));
    assert_eq!(above.timestamp_ms, 1_000_000_000_001);
  }

  #[test]
  fn missing_timestamp_takes_sentinel() {
    let alert = normalize_default(json!({"heartRate": 72}));
    assert_eq!(alert.timestamp_ms, UNKNOWN_TIMESTAMP_MS);
  }

  #[test]
  fn magnitude_reconciliation_is_equivalent_across_field_names() {
    let primary = normalize_default(json!({"accelMagG": 4.2}));
    let fallback = normalize_default(json!({"accelG": 4.2}));
    assert_eq!(primary.accel_mag_g, fallback.accel_mag_g);

    let gyro = normalize_default(json!({"gyroMag": 118.5}));
    assert_eq!(gyro.gyro_mag_dps, Some(118.5));
  }

  #[test]
  fn magnitude_priority_order_is_fixed() {
    let alert = normalize_default(json!({"accelMagG": 4.2, "accelG": 9.9}));
    assert_eq!(alert.accel_mag_g, Some(4.2));
  }

  #[test]
  fn missing_labels_take_placeholders() {
    let alert = normalize_default(json!({}));
    assert_eq!(alert.device_id, "ESP32");
    assert_eq!(alert.event, "accident");

    let config = FeedConfig {
      device_placeholder: "field-unit".into(),
      ..FeedConfig::default()
    };
    let alert = normalize("k1", &record(json!({})), &config);
    assert_eq!(alert.device_id, "field-unit");
  }

  #[test]
  fn numeric_strings_are_coerced() {
    let alert = normalize_default(json!({"heartRate": "96", "spo2": " 93 "}));
    assert_eq!(alert.heart_rate, Some(96.0));
    assert_eq!(alert.spo2, Some(93.0));
  }

  #[test]
  fn gps_valid_truthiness() {
    assert!(!normalize_default(json!({})).gps_valid);
    assert!(!normalize_default(json!({"gpsValid": false})).gps_valid);
    assert!(!normalize_default(json!({"gpsValid": 0})).gps_valid);
    assert!(normalize_default(json!({"gpsValid": true})).gps_valid);
    assert!(normalize_default(json!({"gpsValid": 1})).gps_valid);
    assert!(normalize_default(json!({"gpsValid": "true"})).gps_valid);
    assert!(!normalize_default(json!({"gpsValid": "yes"})).gps_valid);
  }

  #[test]
  fn wrong_typed_fields_degrade_to_absent() {
    let alert = normalize_default(json!({
      "heartRate": {"nested": true},
      "deviceId": 42,
      "lat": "not-a-number"
    }));
    assert_eq!(alert.heart_rate, None);
    assert_eq!(alert.device_id, "ESP32");
    assert_eq!(alert.lat, None);
  }

  #[test]
  fn normalize_is_idempotent() {
    let raw = record(json!({
      "deviceId": "esp32-07",
      "event": "crash",
      "timestamp": 1_700_000_000i64,
      "accelG": 4.2,
      "heartRate": "96",
      "gpsValid": 1,
      "severity": "critical"
    }));
    let config = FeedConfig::default();
    assert_eq!(normalize("k1", &raw, &config), normalize("k1", &raw, &config));
  }
}
