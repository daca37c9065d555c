pub mod json_feed;

use anyhow::Result;
use std::sync::Arc;

use crate::config::calendar::FeedConfig;
use crate::ingest::types::SourceAdapter;
use json_feed::JsonFeedAdapter;

/// Build one adapter per enabled feed. A URL wins over a path.
pub fn from_feeds(feeds: &[FeedConfig]) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut out: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(feeds.len());
    for feed in feeds.iter().filter(|f| f.enabled) {
        let adapter = match (&feed.url, &feed.path) {
            (Some(url), _) => JsonFeedAdapter::from_url(feed.source, url.clone())?,
            (None, Some(path)) => JsonFeedAdapter::from_path(feed.source, path.clone()),
            (None, None) => continue,
        };
        tracing::info!(source = %feed.source, "feed enabled");
        out.push(Arc::new(adapter));
    }
    Ok(out)
}
