// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod reconcile;
pub mod source_priority;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::Aggregator;
pub use crate::api::router;
pub use crate::cache::CacheStore;
pub use crate::ingest::types::SourceAdapter;
pub use crate::model::{Event, EventCandidate, EventType, Milestone, Source};
pub use crate::notify::Notifier;
pub use crate::source_priority::SourcePriorities;
