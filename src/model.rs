//! # Event model
//!
//! Canonical event record shared by every stage of the pipeline:
//! adapters produce [`EventCandidate`]s, the core turns them into [`Event`]s
//! with a deterministic per-source id and three monotonic milestone flags.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Token sentinel used when a feed could not extract a ticker.
pub const UNKNOWN_TOKEN: &str = "UNKNOWN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Launchpool,
    Listing,
    Unlock,
    Airdrop,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Launchpool,
        EventType::Listing,
        EventType::Unlock,
        EventType::Airdrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Launchpool => "launchpool",
            EventType::Listing => "listing",
            EventType::Unlock => "unlock",
            EventType::Airdrop => "airdrop",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = anyhow::Error;

    /// Case-insensitive; plural forms ("listings") are accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let s = s.strip_suffix('s').unwrap_or(&s);
        match s {
            "launchpool" => Ok(EventType::Launchpool),
            "listing" => Ok(EventType::Listing),
            "unlock" => Ok(EventType::Unlock),
            "airdrop" => Ok(EventType::Airdrop),
            other => anyhow::bail!("unknown event type: {other}"),
        }
    }
}

/// Origin feed. The set is closed; its ranking lives in `source_priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Binance,
    Bybit,
    Okx,
    TokenUnlocks,
    Airdrops,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Binance,
        Source::Bybit,
        Source::Okx,
        Source::TokenUnlocks,
        Source::Airdrops,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Binance => "binance",
            Source::Bybit => "bybit",
            Source::Okx => "okx",
            Source::TokenUnlocks => "tokenunlocks",
            Source::Airdrops => "airdrops",
        }
    }

    /// Human-facing label ("Binance", "OKX", ...).
    pub fn label(&self) -> &'static str {
        match self {
            Source::Binance => "Binance",
            Source::Bybit => "Bybit",
            Source::Okx => "OKX",
            Source::TokenUnlocks => "TokenUnlocks",
            Source::Airdrops => "Airdrops",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown source: {s}"))
    }
}

/// What an adapter hands to the core. No identity, no flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCandidate {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source: Source,
    pub token: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub details: String,
}

/// One occurrence of a market event, with its notification state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source: Source,
    pub token: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub sent_digest: bool,
    #[serde(default)]
    pub sent_24h: bool,
    #[serde(default)]
    pub sent_2h: bool,
}

impl Event {
    /// Normalizes the token and derives the per-source id. Flags start unset.
    pub fn from_candidate(c: EventCandidate) -> Self {
        let token = normalize_token(&c.token);
        Self {
            id: make_event_id(c.source, &token, c.date),
            kind: c.kind,
            source: c.source,
            token,
            title: c.title,
            date: c.date,
            url: c.url,
            details: c.details,
            sent_digest: false,
            sent_24h: false,
            sent_2h: false,
        }
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            token: self.token.clone(),
            day: self.date.date_naive(),
            kind: self.kind,
        }
    }

    /// OR the other record's flags into this one. Never clears a flag.
    pub fn absorb_flags(&mut self, other: &Event) {
        self.sent_digest |= other.sent_digest;
        self.sent_24h |= other.sent_24h;
        self.sent_2h |= other.sent_2h;
    }
}

/// Reconciliation key: same token, same UTC day, same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub token: String,
    pub day: NaiveDate,
    pub kind: EventType,
}

/// The three independent notification milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    Digest,
    Alert24h,
    Alert2h,
}

impl Milestone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::Digest => "digest",
            Milestone::Alert24h => "alert_24h",
            Milestone::Alert2h => "alert_2h",
        }
    }

    pub fn is_sent(&self, ev: &Event) -> bool {
        match self {
            Milestone::Digest => ev.sent_digest,
            Milestone::Alert24h => ev.sent_24h,
            Milestone::Alert2h => ev.sent_2h,
        }
    }

    pub fn mark(&self, ev: &mut Event) {
        match self {
            Milestone::Digest => ev.sent_digest = true,
            Milestone::Alert24h => ev.sent_24h = true,
            Milestone::Alert2h => ev.sent_2h = true,
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper-case and trim; empty input becomes [`UNKNOWN_TOKEN`].
pub fn normalize_token(raw: &str) -> String {
    let t = raw.trim();
    if t.is_empty() {
        UNKNOWN_TOKEN.to_string()
    } else {
        t.to_uppercase()
    }
}

/// Deterministic id: `source:TOKEN:YYYYMMDD` (UTC day).
pub fn make_event_id(source: Source, token: &str, date: DateTime<Utc>) -> String {
    format!(
        "{}:{}:{}",
        source.as_str(),
        token.to_uppercase(),
        date.format("%Y%m%d")
    )
}
