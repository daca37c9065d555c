// src/ingest/scheduler.rs
use chrono::Utc;
use metrics::counter;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::aggregator::Aggregator;
use crate::dispatch::{self, DigestSchedule};
use crate::notify::Notifier;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub refresh_interval: Duration,
    pub refresh_deadline: Duration,
    pub milestone_interval: Duration,
    pub digest: DigestSchedule,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60 * 60),
            refresh_deadline: Duration::from_secs(60),
            milestone_interval: Duration::from_secs(60 * 60),
            digest: DigestSchedule::default(),
        }
    }
}

/// Spawn the background loop: refresh on one ticker, milestone checks on
/// another. Both fire once immediately, refresh first.
pub fn spawn_scheduler(
    agg: Arc<Aggregator>,
    notifier: Arc<dyn Notifier>,
    cfg: SchedulerCfg,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut refresh_tick = tokio::time::interval(cfg.refresh_interval);
        let mut milestone_tick = tokio::time::interval(cfg.milestone_interval);
        refresh_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        milestone_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = refresh_tick.tick() => {
                    let events = agg.refresh(cfg.refresh_deadline).await;
                    counter!("scheduler_refresh_total").increment(1);
                    tracing::info!(target: "scheduler", events = events.len(), "refresh tick");
                }
                _ = milestone_tick.tick() => {
                    let reports =
                        dispatch::run_milestones(&agg, notifier.as_ref(), &cfg.digest, Utc::now()).await;
                    for (milestone, r) in reports {
                        tracing::info!(
                            target: "scheduler",
                            %milestone,
                            selected = r.selected,
                            delivered = r.delivered,
                            failed = r.failed,
                            "milestone tick"
                        );
                    }
                }
            }
        }
    })
}
