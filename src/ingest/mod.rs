// src/ingest/mod.rs
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::SourceAdapter;
use crate::model::EventCandidate;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinSet;

/// Per-adapter sub-deadline.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(20);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collector_runs_total", "Collector fan-out runs.");
        describe_counter!(
            "collector_candidates_total",
            "Candidates returned by adapters."
        );
        describe_counter!(
            "collector_source_errors_total",
            "Adapter failures and timeouts."
        );
        describe_histogram!("collector_scan_ms", "Adapter scan time in milliseconds.");
    });
}

/// Scan every adapter concurrently and concatenate what comes back.
///
/// Each adapter runs on its own task under `min(per_source, deadline)`; the
/// whole join is bounded by `deadline` and stragglers are aborted. Failures
/// and timeouts are logged and contribute nothing. Output order across
/// adapters is unspecified.
pub async fn collect(
    adapters: &[Arc<dyn SourceAdapter>],
    deadline: Duration,
    per_source: Duration,
) -> Vec<EventCandidate> {
    ensure_metrics_described();
    counter!("collector_runs_total").increment(1);

    let sub_deadline = per_source.min(deadline);
    let mut tasks = JoinSet::new();
    for adapter in adapters {
        let adapter = Arc::clone(adapter);
        tasks.spawn(async move {
            let source = adapter.source();
            let t0 = std::time::Instant::now();
            let res = tokio::time::timeout(sub_deadline, adapter.scan()).await;
            (source, t0.elapsed(), res)
        });
    }

    let mut out = Vec::new();
    let joined = tokio::time::timeout(deadline, async {
        while let Some(joined) = tasks.join_next().await {
            let (source, elapsed, res) = match joined {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "scan task aborted");
                    counter!("collector_source_errors_total").increment(1);
                    continue;
                }
            };
            histogram!("collector_scan_ms", "source" => source.as_str())
                .record(elapsed.as_secs_f64() * 1_000.0);

            match res {
                Ok(Ok(mut candidates)) => {
                    tracing::debug!(%source, count = candidates.len(), "scan ok");
                    counter!("collector_candidates_total", "source" => source.as_str())
                        .increment(candidates.len() as u64);
                    out.append(&mut candidates);
                }
                Ok(Err(e)) => {
                    tracing::warn!(%source, error = %format!("{e:#}"), "scan failed");
                    counter!("collector_source_errors_total", "source" => source.as_str())
                        .increment(1);
                }
                Err(_) => {
                    tracing::warn!(%source, timeout_ms = sub_deadline.as_millis() as u64, "scan timed out");
                    counter!("collector_source_errors_total", "source" => source.as_str())
                        .increment(1);
                }
            }
        }
    })
    .await;

    if joined.is_err() {
        tracing::warn!(pending = tasks.len(), "refresh deadline hit, abandoning remaining scans");
        tasks.abort_all();
    }

    out
}
