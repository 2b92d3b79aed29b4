//! Core types for the alert feed engine (raw snapshot layer + canonical models).

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Raw snapshot layer (what the live store delivers)
// ---------------------------------------------------------------------------

/// One raw alert record: an untyped field mapping. Any field may be absent,
/// null, or of unexpected type; nothing here is trusted.
pub type RawRecord = serde_json::Map<String, Value>;

/// The complete current value of a watched path, keyed by record id.
/// BTreeMap fixes the iteration order so projection is deterministic.
pub type Snapshot = BTreeMap<String, RawRecord>;

/// Shape of the raw value at a watched path. Two shapes are observed in
/// practice; both adapt to the same canonical Snapshot so engine logic never
/// forks per schema.
#[derive(Debug, Clone)]
pub enum SnapshotShape {
  /// A flat object of `id -> record` (the alerts collection path).
  Collection,
  /// A single record stored directly at the path, keyed under a fixed id.
  Single { id: String },
}

impl SnapshotShape {
  /// Adapt a raw path value into a canonical Snapshot. Total: a non-object
  /// where a record was expected degrades to an empty field mapping.
  pub fn adapt(&self, value: &Value) -> Snapshot {
    match self {
      Self::Collection => match value.as_object() {
        Some(map) => map.iter().map(|(id, v)| (id.clone(), as_record(v))).collect(),
        None => Snapshot::new(),
      },
      Self::Single { id } => {
        if value.is_null() {
          Snapshot::new()
        } else {
          let mut snapshot = Snapshot::new();
          snapshot.insert(id.clone(), as_record(value));
          snapshot
        }
      }
    }
  }
}

fn as_record(value: &Value) -> RawRecord {
  value.as_object().cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Canonical alert
// ---------------------------------------------------------------------------

/// Timestamp sentinel for records with no usable timestamp field. Sorts as
/// the oldest possible alert.
pub const UNKNOWN_TIMESTAMP_MS: i64 = 0;

/// Derived urgency classification from the loose severity/status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
  Normal,
  Elevated,
  Critical,
}

impl Criticality {
  /// Loose classification of the severity/status strings devices send.
  /// A resolved status wins over severity; unclassified alerts default to
  /// Critical (these are crash alerts, so under-triage is the worse failure).
  pub fn derive(severity: Option<&str>, status: Option<&str>) -> Self {
    if let Some(s) = status {
      if matches!(
        s.to_ascii_lowercase().as_str(),
        "resolved" | "cleared" | "closed"
      ) {
        return Self::Normal;
      }
    }
    match severity.map(|s| s.to_ascii_lowercase()) {
      Some(s) => match s.as_str() {
        "normal" | "low" | "info" | "ok" => Self::Normal,
        "warning" | "warn" | "elevated" | "moderate" | "medium" => Self::Elevated,
        _ => Self::Critical,
      },
      None => Self::Critical,
    }
  }
}

/// Canonical alert after normalization. Serializes in the camelCase wire
/// shape the field devices write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
  /// The store's record key. Always present.
  pub id: String,
  pub device_id: String,
  pub event: String,
  /// Epoch milliseconds; UNKNOWN_TIMESTAMP_MS when no timestamp field existed.
  pub timestamp_ms: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub accel_mag_g: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gyro_mag_dps: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub heart_rate: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub spo2: Option<f64>,
  pub gps_valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lat: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lng: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub severity: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  pub criticality: Criticality,
}

impl Alert {
  /// UTC time of the alert, or None when the timestamp is the unknown
  /// sentinel or out of chrono's representable range.
  pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
    if self.timestamp_ms == UNKNOWN_TIMESTAMP_MS {
      return None;
    }
    Utc.timestamp_millis_opt(self.timestamp_ms).single()
  }
}

// ---------------------------------------------------------------------------
// Feed state
// ---------------------------------------------------------------------------

/// Ordered view of one snapshot: alerts newest first. The latest alert is by
/// definition the first element, so list and latest cannot drift apart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
  pub alerts: Vec<Alert>,
}

impl Projection {
  pub fn latest(&self) -> Option<&Alert> {
    self.alerts.first()
  }
}

/// Subscription lifecycle state. Every delivered snapshot fully replaces the
/// previous Ready/Empty state; there are no partial updates.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
  /// Subscribed, first snapshot not yet delivered.
  Loading,
  /// The watched path currently holds no records.
  Empty,
  /// Ordered projection of the most recently applied snapshot.
  Ready(Projection),
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Serialized feed state for the CLI stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStateOutput {
  Loading,
  Empty,
  Ready {
    alerts: Vec<Alert>,
    latest: Alert,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_time: Option<DateTime<Utc>>,
  },
}

impl From<&FeedState> for FeedStateOutput {
  fn from(state: &FeedState) -> Self {
    match state {
      FeedState::Loading => Self::Loading,
      FeedState::Empty => Self::Empty,
      FeedState::Ready(projection) => match projection.latest() {
        Some(latest) => Self::Ready {
          alerts: projection.alerts.clone(),
          latest_time: latest.timestamp_utc(),
          latest: latest.clone(),
        },
        // A Ready projection is never built from an empty snapshot; degrade
        // rather than panic if one is constructed by hand.
        None => Self::Empty,
      },
    }
  }
}

/// Structured error output for invalid CLI input lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
    }
  }
}
