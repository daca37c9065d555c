//! Crypto Event Calendar: binary entrypoint.
//! Loads config, restores the event cache, starts the refresh/notify
//! scheduler and serves the read-only HTTP API.

use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_event_calendar::{
    api::{self, AppState},
    cache::{CacheStore, RETENTION_HOURS},
    config::CalendarConfig,
    ingest::{
        providers,
        scheduler::{spawn_scheduler, SchedulerCfg},
    },
    metrics::Metrics,
    notify::{telegram::TelegramNotifier, LogNotifier, Notifier},
    Aggregator,
};

/// Compact logs by default; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_event_calendar=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn build_notifier(cfg: &CalendarConfig) -> Arc<dyn Notifier> {
    if cfg.telegram.is_configured() {
        Arc::new(TelegramNotifier::new(
            cfg.telegram.bot_token.clone(),
            cfg.telegram.chat_id.clone(),
        ))
    } else {
        tracing::warn!("telegram not configured, notifications go to the log only");
        Arc::new(LogNotifier)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = CalendarConfig::load_default().context("loading calendar config")?;
    let metrics = Metrics::init(RETENTION_HOURS)?;

    let adapters = providers::from_feeds(&cfg.feeds)?;
    if adapters.is_empty() {
        tracing::warn!("no feeds configured, refresh will only evict");
    }

    let store = CacheStore::load(&cfg.cache_path);
    let aggregator = Arc::new(
        Aggregator::new(store, adapters, cfg.priorities())
            .with_scan_timeout(Duration::from_secs(cfg.scan_timeout_secs)),
    );

    let refresh_deadline = Duration::from_secs(cfg.refresh_deadline_secs);
    let scheduler = spawn_scheduler(
        Arc::clone(&aggregator),
        build_notifier(&cfg),
        SchedulerCfg {
            refresh_interval: Duration::from_secs(cfg.refresh_interval_minutes * 60),
            refresh_deadline,
            milestone_interval: Duration::from_secs(60 * 60),
            digest: cfg.digest_schedule()?,
        },
    );

    let state = AppState {
        aggregator,
        refresh_deadline,
    };
    let app = api::router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    tracing::info!(
        addr = %cfg.listen_addr,
        refresh_minutes = cfg.refresh_interval_minutes,
        "crypto event calendar started"
    );

    tokio::select! {
        res = axum::serve(listener, app) => res.context("http server")?,
        res = scheduler => res.context("scheduler task")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
