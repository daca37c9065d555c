//! Milestone dispatch: select due events, deliver, mark on success.
//!
//! A failed delivery leaves the flag unset so the next tick retries; it never
//! blocks sibling alerts in the same batch.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Timelike, Utc, Weekday};
use metrics::counter;
use serde::Serialize;

use crate::aggregator::Aggregator;
use crate::model::{Event, Milestone};
use crate::notify::{format, Notifier};
use crate::window;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Weekly digest slot: weekday + UTC hour (minutes are informational).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestSchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl DigestSchedule {
    /// `weekday` like "monday"/"Mon", `time_utc` like "09:00".
    pub fn parse(weekday: &str, time_utc: &str) -> Result<Self> {
        let weekday = weekday
            .trim()
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("invalid digest weekday: {weekday}"))?;
        let time = NaiveTime::parse_from_str(time_utc.trim(), "%H:%M")
            .with_context(|| format!("invalid digest time: {time_utc}"))?;
        Ok(Self { weekday, time })
    }

    /// True during the configured hour of the configured weekday.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        use chrono::Datelike;
        now.weekday() == self.weekday && now.hour() == self.time.hour()
    }
}

impl Default for DigestSchedule {
    fn default() -> Self {
        Self {
            weekday: Weekday::Mon,
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Deliver whatever `milestone` selects right now.
pub async fn dispatch(
    agg: &Aggregator,
    notifier: &dyn Notifier,
    milestone: Milestone,
    now: DateTime<Utc>,
) -> DispatchReport {
    let due = window::due(&agg.events(), milestone, now);
    match milestone {
        Milestone::Digest => deliver_digest(agg, notifier, due, now).await,
        Milestone::Alert24h => {
            deliver_each(agg, notifier, milestone, due, format::format_alert_24h).await
        }
        Milestone::Alert2h => {
            deliver_each(agg, notifier, milestone, due, format::format_alert_2h).await
        }
    }
}

/// One hourly tick: digest if its slot is open, then both alert kinds.
pub async fn run_milestones(
    agg: &Aggregator,
    notifier: &dyn Notifier,
    schedule: &DigestSchedule,
    now: DateTime<Utc>,
) -> Vec<(Milestone, DispatchReport)> {
    let mut reports = Vec::with_capacity(3);
    if schedule.is_due(now) {
        reports.push((
            Milestone::Digest,
            dispatch(agg, notifier, Milestone::Digest, now).await,
        ));
    }
    for m in [Milestone::Alert24h, Milestone::Alert2h] {
        reports.push((m, dispatch(agg, notifier, m, now).await));
    }
    reports
}

/// The digest goes out as one message; all included events are marked together.
async fn deliver_digest(
    agg: &Aggregator,
    notifier: &dyn Notifier,
    due: Vec<Event>,
    now: DateTime<Utc>,
) -> DispatchReport {
    let mut report = DispatchReport {
        selected: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        tracing::debug!("digest: nothing new");
        return report;
    }

    let text = format::format_digest(&due, now, now + ChronoDuration::days(window::DIGEST_LOOKAHEAD_DAYS));
    match notifier.deliver(&text).await {
        Ok(()) => {
            for e in &due {
                agg.mark_sent(&e.id, Milestone::Digest);
            }
            report.delivered = due.len();
            counter!("notify_delivered_total", "milestone" => Milestone::Digest.as_str())
                .increment(due.len() as u64);
            tracing::info!(count = due.len(), channel = notifier.name(), "digest sent");
        }
        Err(e) => {
            report.failed = due.len();
            counter!("notify_failed_total", "milestone" => Milestone::Digest.as_str()).increment(1);
            tracing::warn!(error = %format!("{e:#}"), channel = notifier.name(), "digest send failed");
        }
    }
    report
}

async fn deliver_each(
    agg: &Aggregator,
    notifier: &dyn Notifier,
    milestone: Milestone,
    due: Vec<Event>,
    render: fn(&Event) -> String,
) -> DispatchReport {
    let mut report = DispatchReport {
        selected: due.len(),
        ..Default::default()
    };

    for e in &due {
        match notifier.deliver(&render(e)).await {
            Ok(()) => {
                agg.mark_sent(&e.id, milestone);
                report.delivered += 1;
                counter!("notify_delivered_total", "milestone" => milestone.as_str()).increment(1);
                tracing::info!(id = %e.id, %milestone, "alert sent");
            }
            Err(err) => {
                report.failed += 1;
                counter!("notify_failed_total", "milestone" => milestone.as_str()).increment(1);
                tracing::warn!(id = %e.id, %milestone, error = %format!("{err:#}"), "alert send failed");
            }
        }
    }
    report
}
