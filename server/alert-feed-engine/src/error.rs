//! Structured error types for the feed CLI boundary.
//!
//! The engine core (normalizer, projector, feed state machine) is total over
//! adversarial input and never surfaces these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
  #[error("line: {0}")]
  Line(String),

  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
}

impl FeedError {
  pub fn line(msg: impl Into<String>) -> Self {
    Self::Line(msg.into())
  }
}
