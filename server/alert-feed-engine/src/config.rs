//! Feed configuration with sane defaults.

/// Tunable constants for record normalization.
#[derive(Debug, Clone)]
pub struct FeedConfig {
  /// Label substituted when a record has no usable deviceId field.
  pub device_placeholder: String,
  /// Label substituted when a record has no usable event field.
  pub event_placeholder: String,
  /// Unit cutoff for the generic `timestamp` field: values <= cutoff are
  /// seconds (multiplied by 1000), values above are already milliseconds.
  /// Best-effort guess inherited from the device firmware; large
  /// second-based values past the cutoff would be misread as milliseconds.
  pub seconds_cutoff_ms: i64,
}

impl Default for FeedConfig {
  fn default() -> Self {
    Self {
      device_placeholder: "ESP32".to_string(),
      event_placeholder: "accident".to_string(),
      seconds_cutoff_ms: 1_000_000_000_000,
    }
  }
}
