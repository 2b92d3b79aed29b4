//! TraumaLink Alert Feed Engine — deterministic, schema-tolerant.
//!
//! Ingests crash/trauma alert records pushed by field devices into a shared
//! live data store, reconciles schema drift (renamed fields, seconds vs
//! milliseconds, missing values) into canonical Alerts, keeps a stable
//! newest-first ordering per snapshot, and runs the Loading/Empty/Ready
//! subscription state machine.
//!
//! No DB, no network; pure computation + in-memory state. Connectivity and
//! retry belong to the live-store client behind the [`LiveStore`] capability.

pub mod config;
pub mod error;
pub mod feed;
pub mod normalize;
pub mod project;
pub mod store;
pub mod types;

pub use config::FeedConfig;
pub use error::FeedError;
pub use feed::{AlertFeed, LiveStore, SnapshotFn};
pub use store::MemoryStore;
pub use types::{Alert, Criticality, FeedState, Projection, Snapshot, SnapshotShape};
