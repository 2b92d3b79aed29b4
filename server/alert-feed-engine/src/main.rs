//! Binary entrypoint: replay snapshot JSON lines through the feed engine.
//!
//! Each input line is the full raw value of the watched alerts collection
//! (an object of id -> record, or null). After each line the current feed
//! state is written as one JSON line: loading, empty, or ready with the
//! ordered alerts and the latest alert. Malformed lines produce an
//! ErrorOutput line and processing continues.

use std::io::{self, BufRead, Write};

use alert_feed_engine::types::{ErrorOutput, FeedStateOutput};
use alert_feed_engine::{AlertFeed, FeedConfig, FeedError, MemoryStore, SnapshotShape};

const ALERTS_PATH: &str = "alerts";

fn main() {
  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  let store = MemoryStore::new();
  let mut feed = AlertFeed::subscribe(
    &store,
    ALERTS_PATH,
    SnapshotShape::Collection,
    FeedConfig::default(),
  );

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        let _ = writeln!(io::stderr(), "alert-feed-engine: read error: {}", e);
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    match parse_snapshot_line(trimmed) {
      Ok(value) => store.push(ALERTS_PATH, value),
      Err(e) => {
        let _ = serde_json::to_writer(&mut out, &ErrorOutput::new(e.to_string()));
        let _ = writeln!(out);
        continue;
      }
    }

    let _ = serde_json::to_writer(&mut out, &FeedStateOutput::from(&feed.state()));
    let _ = writeln!(out);
  }

  feed.cancel();
  let _ = out.flush();
}

/// A snapshot line is the raw path value: a JSON object or null.
fn parse_snapshot_line(line: &str) -> Result<Option<serde_json::Value>, FeedError> {
  let value: serde_json::Value = serde_json::from_str(line)?;
  match value {
    serde_json::Value::Null => Ok(None),
    serde_json::Value::Object(_) => Ok(Some(value)),
    other => Err(FeedError::line(format!(
      "snapshot must be an object or null, got {}",
      json_kind(&other)
    ))),
  }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "bool",
    serde_json::Value::Number(_) => "number",
    serde_json::Value::String(_) => "string",
    serde_json::Value::Array(_) => "array",
    serde_json::Value::Object(_) => "object",
  }
}
