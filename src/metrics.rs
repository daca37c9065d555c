use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the cache/notify series.
    pub fn init(retention_hours: i64) -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_gauge!("cache_events", "Per-source records currently cached.");
        describe_counter!("cache_evicted_total", "Records evicted past retention.");
        describe_counter!("notify_delivered_total", "Milestone messages delivered.");
        describe_counter!("notify_failed_total", "Milestone deliveries that failed.");
        describe_counter!("scheduler_refresh_total", "Scheduled refresh runs.");

        // Static gauge with the eviction horizon
        gauge!("cache_retention_hours").set(retention_hours as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
