// src/config/calendar.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::dispatch::DigestSchedule;
use crate::model::Source;
use crate::source_priority::SourcePriorities;

pub const ENV_CONFIG_PATH: &str = "CALENDAR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/calendar.toml";

fn default_cache_path() -> PathBuf {
    PathBuf::from("data/events.json")
}
fn default_refresh_interval_minutes() -> u64 {
    60
}
fn default_scan_timeout_secs() -> u64 {
    20
}
fn default_refresh_deadline_secs() -> u64 {
    60
}
fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// 0 is treated as the default (60).
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u64,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    #[serde(default = "default_refresh_deadline_secs")]
    pub refresh_deadline_secs: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Absent table → built-in ranking.
    #[serde(default)]
    pub priority: Option<SourcePriorities>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    /// "ENV" means: read from TELEGRAM_BOT_TOKEN
    #[serde(default)]
    pub bot_token: String,
    /// "ENV" means: read from TELEGRAM_CHAT_ID
    #[serde(default)]
    pub chat_id: String,
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

fn default_weekday() -> String {
    "monday".to_string()
}
fn default_digest_time() -> String {
    "09:00".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_weekday")]
    pub digest_weekday: String,
    #[serde(default = "default_digest_time")]
    pub digest_time_utc: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            digest_weekday: default_weekday(),
            digest_time_utc: default_digest_time(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub source: Source,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            scan_timeout_secs: default_scan_timeout_secs(),
            refresh_deadline_secs: default_refresh_deadline_secs(),
            listen_addr: default_listen_addr(),
            telegram: TelegramConfig::default(),
            schedule: ScheduleConfig::default(),
            priority: None,
            feeds: Vec::new(),
        }
    }
}

impl CalendarConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading calendar config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: CalendarConfig = toml::from_str(s)?;
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Resolve the config path:
    /// 1) $CALENDAR_CONFIG_PATH (must exist)
    /// 2) config/calendar.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        let mut cfg = Self::default();
        cfg.normalize()?;
        Ok(cfg)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.refresh_interval_minutes == 0 {
            self.refresh_interval_minutes = default_refresh_interval_minutes();
        }
        if self.scan_timeout_secs == 0 {
            self.scan_timeout_secs = default_scan_timeout_secs();
        }
        if self.refresh_deadline_secs == 0 {
            self.refresh_deadline_secs = default_refresh_deadline_secs();
        }

        self.telegram.bot_token = resolve_env(&self.telegram.bot_token, "TELEGRAM_BOT_TOKEN")?;
        self.telegram.chat_id = resolve_env(&self.telegram.chat_id, "TELEGRAM_CHAT_ID")?;

        for feed in &self.feeds {
            if feed.url.is_none() && feed.path.is_none() {
                return Err(anyhow!("feed for {} needs either `url` or `path`", feed.source));
            }
        }

        // Fail early on a bad schedule rather than silently never sending.
        self.digest_schedule()?;
        Ok(())
    }

    pub fn digest_schedule(&self) -> Result<DigestSchedule> {
        DigestSchedule::parse(&self.schedule.digest_weekday, &self.schedule.digest_time_utc)
    }

    pub fn priorities(&self) -> SourcePriorities {
        self.priority.clone().unwrap_or_default()
    }
}

/// `"ENV"` reads `var`. Unset or blank resolves to empty, which leaves the
/// channel unconfigured and the log notifier in charge.
fn resolve_env(value: &str, var: &str) -> Result<String> {
    if !value.trim().eq_ignore_ascii_case("env") {
        return Ok(value.trim().to_string());
    }
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        Ok(_) | Err(env::VarError::NotPresent) => {
            tracing::warn!(var, "env var unset, leaving it empty");
            Ok(String::new())
        }
        Err(e) => Err(anyhow!("reading {var}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = CalendarConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.cache_path, PathBuf::from("data/events.json"));
        assert_eq!(cfg.refresh_interval_minutes, 60);
        assert_eq!(cfg.scan_timeout_secs, 20);
        assert!(!cfg.telegram.is_configured());
        assert_eq!(cfg.priorities(), SourcePriorities::default_seed());
    }

    #[test]
    fn zero_interval_falls_back() {
        let cfg = CalendarConfig::from_toml_str("refresh_interval_minutes = 0").unwrap();
        assert_eq!(cfg.refresh_interval_minutes, 60);
    }

    #[test]
    fn feeds_and_priority_parse() {
        let cfg = CalendarConfig::from_toml_str(
            r#"
            [priority]
            okx = 1
            binance = 2

            [[feeds]]
            source = "okx"
            url = "https://feeds.example/okx.json"

            [[feeds]]
            source = "tokenunlocks"
            path = "fixtures/unlocks.json"
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.feeds.len(), 2);
        assert!(cfg.feeds[0].enabled);
        assert!(!cfg.feeds[1].enabled);
        assert!(cfg.priorities().outranks(Source::Okx, Source::Binance));
    }

    #[test]
    fn feed_without_location_is_rejected() {
        let res = CalendarConfig::from_toml_str("[[feeds]]\nsource = \"bybit\"\n");
        assert!(res.is_err());
    }

    #[test]
    fn bad_schedule_is_rejected() {
        let res = CalendarConfig::from_toml_str("[schedule]\ndigest_time_utc = \"25:99\"\n");
        assert!(res.is_err());
    }
}
