//! In-memory live store: reference LiveStore client for tests and the CLI.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::feed::{LiveStore, SnapshotFn};

/// In-memory key-value store that pushes full-path snapshots to subscribers
/// on every change, mirroring the hosted live store's contract: a subscriber
/// is delivered the path's current value as soon as one exists.
#[derive(Default)]
pub struct MemoryStore {
  subscribers: Mutex<HashMap<u64, (String, SnapshotFn)>>,
  values: Mutex<HashMap<String, Value>>,
  next_handle: AtomicU64,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Set the value at `path` (None clears it) and deliver it to every
  /// subscriber of that path.
  pub fn push(&self, path: &str, value: Option<Value>) {
    {
      let mut values = lock(&self.values);
      match &value {
        Some(v) => {
          values.insert(path.to_string(), v.clone());
        }
        None => {
          values.remove(path);
        }
      }
    }
    for (registered_path, on_snapshot) in lock(&self.subscribers).values() {
      if registered_path == path {
        on_snapshot(value.as_ref());
      }
    }
  }

  /// Number of active subscriptions across all paths.
  pub fn subscriber_count(&self) -> usize {
    lock(&self.subscribers).len()
  }
}

impl LiveStore for MemoryStore {
  type Handle = u64;

  fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> u64 {
    // Replay the current value, if any, before registering for future pushes.
    if let Some(value) = lock(&self.values).get(path) {
      on_snapshot(Some(value));
    }
    let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
    lock(&self.subscribers).insert(handle, (path.to_string(), on_snapshot));
    handle
  }

  fn release(&self, handle: u64) {
    lock(&self.subscribers).remove(&handle);
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  match mutex.lock() {
    Ok(guard) => guard,
    Err(poisoned) => poisoned.into_inner(),
  }
}
