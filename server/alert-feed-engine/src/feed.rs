//! Live feed subscription: the Loading/Empty/Ready state machine.
//!
//! The live-store client owns connectivity (reconnect, retry, backoff); this
//! module only turns delivered snapshots into feed state. All mutation
//! happens on the client's callback path, guarded against cancellation races
//! and out-of-order delivery.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::config::FeedConfig;
use crate::project::project;
use crate::types::{Alert, FeedState, SnapshotShape};

/// Snapshot delivery callback: invoked with the watched path's full raw
/// value, or None when the path holds no data.
pub type SnapshotFn = Box<dyn Fn(Option<&Value>) + Send + Sync>;

/// Capability exposed by the live-store client: exactly subscribe + release.
pub trait LiveStore {
  type Handle;

  /// Register a callback for the path. The client invokes it with the
  /// path's current value and again on every change.
  fn subscribe(&self, path: &str, on_snapshot: SnapshotFn) -> Self::Handle;

  /// Stop further invocations for this handle.
  fn release(&self, handle: Self::Handle);
}

struct FeedInner {
  state: FeedState,
  /// Sequence of the last applied delivery; older in-flight deliveries that
  /// land after it are stale and must not overwrite newer state.
  applied_seq: u64,
}

struct FeedShared {
  config: FeedConfig,
  shape: SnapshotShape,
  inner: Mutex<FeedInner>,
  cancelled: AtomicBool,
  next_seq: AtomicU64,
}

impl FeedShared {
  fn new(config: FeedConfig, shape: SnapshotShape) -> Self {
    Self {
      config,
      shape,
      inner: Mutex::new(FeedInner {
        state: FeedState::Loading,
        applied_seq: 0,
      }),
      cancelled: AtomicBool::new(false),
      next_seq: AtomicU64::new(0),
    }
  }

  fn lock_inner(&self) -> MutexGuard<'_, FeedInner> {
    match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  /// Apply one delivery. No-op after cancellation or when a newer delivery
  /// has already been applied.
  fn apply(&self, value: Option<&Value>) {
    if self.cancelled.load(Ordering::Acquire) {
      return;
    }
    let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

    // Each delivery is a full replace, so projection runs outside the lock;
    // the lock only guards the final check-and-swap.
    let next = match value {
      None => FeedState::Empty,
      Some(raw) => {
        let snapshot = self.shape.adapt(raw);
        if snapshot.is_empty() {
          FeedState::Empty
        } else {
          FeedState::Ready(project(&snapshot, &self.config))
        }
      }
    };

    let mut inner = self.lock_inner();
    if self.cancelled.load(Ordering::Acquire) {
      return;
    }
    if seq < inner.applied_seq {
      return;
    }
    inner.applied_seq = seq;
    inner.state = next;
  }
}

/// One owned subscription to an alert path.
///
/// Created in Loading, transitions on every delivery, cancelled explicitly
/// or on drop, so a subscription can never leak past its owner.
pub struct AlertFeed<'a, S: LiveStore> {
  store: &'a S,
  handle: Option<S::Handle>,
  shared: Arc<FeedShared>,
}

impl<'a, S: LiveStore> AlertFeed<'a, S> {
  /// Subscribe to `path`, interpreting its raw value via `shape`.
  pub fn subscribe(store: &'a S, path: &str, shape: SnapshotShape, config: FeedConfig) -> Self {
    let shared = Arc::new(FeedShared::new(config, shape));
    let callback_shared = Arc::clone(&shared);
    let handle = store.subscribe(path, Box::new(move |value| callback_shared.apply(value)));
    Self {
      store,
      handle: Some(handle),
      shared,
    }
  }

  /// Cancel the subscription and release the store handle. Synchronous: once
  /// this returns no further state transition can occur; a delivery racing
  /// with cancellation observes the flag and drops its snapshot.
  pub fn cancel(&mut self) {
    if let Some(handle) = self.handle.take() {
      self.shared.cancelled.store(true, Ordering::Release);
      // Fence on the state lock so an apply() already past its first flag
      // check finishes before we return.
      drop(self.shared.lock_inner());
      self.store.release(handle);
    }
  }

  pub fn is_loading(&self) -> bool {
    matches!(self.shared.lock_inner().state, FeedState::Loading)
  }

  pub fn is_empty(&self) -> bool {
    matches!(self.shared.lock_inner().state, FeedState::Empty)
  }

  /// Alerts of the most recently applied snapshot, newest first.
  pub fn ordered_alerts(&self) -> Vec<Alert> {
    match &self.shared.lock_inner().state {
      FeedState::Ready(projection) => projection.alerts.clone(),
      _ => Vec::new(),
    }
  }

  /// The newest alert of the most recently applied snapshot.
  pub fn latest(&self) -> Option<Alert> {
    match &self.shared.lock_inner().state {
      FeedState::Ready(projection) => projection.latest().cloned(),
      _ => None,
    }
  }

  /// Consistent clone of the full current state.
  pub fn state(&self) -> FeedState {
    self.shared.lock_inner().state.clone()
  }
}

impl<S: LiveStore> Drop for AlertFeed<'_, S> {
  fn drop(&mut self) {
    self.cancel();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use serde_json::json;

  fn feed(store: &MemoryStore) -> AlertFeed<'_, MemoryStore> {
    AlertFeed::subscribe(
      store,
      "alerts",
      SnapshotShape::Collection,
      FeedConfig::default(),
    )
  }

  #[test]
  fn starts_loading_until_first_delivery() {
    let store = MemoryStore::new();
    let feed = feed(&store);
    assert!(feed.is_loading());
    assert!(!feed.is_empty());
    assert!(feed.ordered_alerts().is_empty());
    assert!(feed.latest().is_none());
  }

  #[test]
  fn non_empty_snapshot_becomes_ready() {
    let store = MemoryStore::new();
    let feed = feed(&store);
    store.push(
      "alerts",
      Some(json!({
        "a": {"timestampMs": 1000},
        "b": {"timestampMs": 2000}
      })),
    );
    let ids: Vec<_> = feed.ordered_alerts().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, ["b", "a"]);
    assert_eq!(feed.latest().map(|a| a.id), Some("b".to_string()));
  }

  #[test]
  fn absent_and_zero_record_values_become_empty() {
    let store = MemoryStore::new();
    let feed = feed(&store);

    store.push("alerts", None);
    assert!(feed.is_empty());

    store.push("alerts", Some(json!({"a": {"timestampMs": 1}})));
    assert!(!feed.is_empty());

    store.push("alerts", Some(json!({})));
    assert!(feed.is_empty());
  }

  #[test]
  fn delivery_after_cancel_is_dropped() {
    let shared = FeedShared::new(FeedConfig::default(), SnapshotShape::Collection);
    shared.apply(Some(&json!({"a": {"timestampMs": 1}})));
    assert!(matches!(shared.lock_inner().state, FeedState::Ready(_)));

    shared.cancelled.store(true, Ordering::Release);
    shared.apply(None);
    assert!(matches!(shared.lock_inner().state, FeedState::Ready(_)));
  }

  #[test]
  fn stale_delivery_does_not_overwrite_newer_state() {
    let shared = FeedShared::new(FeedConfig::default(), SnapshotShape::Collection);
    shared.apply(Some(&json!({"a": {"timestampMs": 1}})));

    // Simulate a newer delivery having been applied while an older one was
    // still in flight: the in-flight one draws a lower sequence and loses.
    shared.lock_inner().applied_seq = 10;
    shared.apply(None);
    assert!(matches!(shared.lock_inner().state, FeedState::Ready(_)));
  }

  #[test]
  fn cancel_releases_the_store_handle() {
    let store = MemoryStore::new();
    let mut f = feed(&store);
    assert_eq!(store.subscriber_count(), 1);

    f.cancel();
    assert_eq!(store.subscriber_count(), 0);

    // Idempotent.
    f.cancel();
    assert_eq!(store.subscriber_count(), 0);
  }

  #[test]
  fn drop_releases_the_store_handle() {
    let store = MemoryStore::new();
    {
      let _f = feed(&store);
      assert_eq!(store.subscriber_count(), 1);
    }
    assert_eq!(store.subscriber_count(), 0);
  }
}
