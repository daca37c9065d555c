use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use crate::ingest::types::SourceAdapter;
use crate::model::{EventCandidate, EventType, Source};

const USER_AGENT: &str = concat!("crypto-event-calendar/", env!("CARGO_PKG_VERSION"));

/// Wire shape of one feed entry. `source` is not trusted; the adapter's own
/// source is stamped on every candidate.
#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(rename = "type")]
    kind: EventType,
    #[serde(default)]
    token: String,
    #[serde(default)]
    title: String,
    date: DateTime<Utc>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    details: String,
}

/// Adapter over a JSON array of pre-parsed events, read from an inline
/// fixture, a local file, or an HTTP endpoint.
pub struct JsonFeedAdapter {
    source: Source,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    File(PathBuf),
    Http { url: String, client: reqwest::Client },
}

impl JsonFeedAdapter {
    pub fn from_fixture(source: Source, content: &str) -> Self {
        Self {
            source,
            mode: Mode::Fixture(content.to_string()),
        }
    }

    pub fn from_path(source: Source, path: impl Into<PathBuf>) -> Self {
        Self {
            source,
            mode: Mode::File(path.into()),
        }
    }

    pub fn from_url(source: Source, url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .context("build feed http client")?;
        Ok(Self {
            source,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    async fn body(&self) -> Result<String> {
        match &self.mode {
            Mode::Fixture(s) => Ok(s.clone()),
            Mode::File(p) => tokio::fs::read_to_string(p)
                .await
                .with_context(|| format!("read feed {}", p.display())),
            Mode::Http { url, client } => client
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?
                .error_for_status()
                .context("feed non-2xx")?
                .text()
                .await
                .context("read feed body"),
        }
    }

    /// Parse leniently: malformed entries are skipped, not fatal.
    fn parse(&self, body: &str) -> Result<Vec<EventCandidate>> {
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(body).context("feed is not a JSON array")?;
        let total = raw.len();

        let out: Vec<EventCandidate> = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<FeedItem>(v).ok())
            .map(|it| EventCandidate {
                kind: it.kind,
                source: self.source,
                token: it.token,
                title: it.title,
                date: it.date,
                url: it.url,
                details: it.details,
            })
            .collect();

        if out.len() < total {
            tracing::debug!(
                source = %self.source,
                skipped = total - out.len(),
                "skipped malformed feed entries"
            );
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for JsonFeedAdapter {
    async fn scan(&self) -> Result<Vec<EventCandidate>> {
        let body = self.body().await?;
        self.parse(&body)
    }

    fn source(&self) -> Source {
        self.source
    }
}
