// src/ingest/types.rs
use anyhow::Result;

use crate::model::{EventCandidate, Source};

/// One feed. Implementations should return quickly once cancelled and prefer
/// an empty vec over an error for partial upstream trouble.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn scan(&self) -> Result<Vec<EventCandidate>>;
    fn source(&self) -> Source;
}
