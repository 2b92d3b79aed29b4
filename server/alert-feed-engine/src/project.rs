//! Project one full snapshot into a stable newest-first alert ordering.

use crate::config::FeedConfig;
use crate::normalize::normalize;
use crate::types::{Projection, Snapshot};

/// Normalize every record in the snapshot and stable-sort newest first.
///
/// Ties on timestamp keep the snapshot's key order (`sort_by` is stable and
/// Snapshot iteration order is fixed), so repeated projections of the same
/// snapshot are identical. Sentinel timestamps sort as oldest.
pub fn project(snapshot: &Snapshot, config: &FeedConfig) -> Projection {
  let mut alerts: Vec<_> = snapshot
    .iter()
    .map(|(id, raw)| normalize(id, raw, config))
    .collect();
  alerts.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
  Projection { alerts }
}
