// tests/dispatch_milestones.rs
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use crypto_event_calendar::{
    dispatch::{self, DigestSchedule, DispatchReport},
    Aggregator, CacheStore, Event, EventCandidate, EventType, Milestone, Notifier, Source,
    SourcePriorities,
};

/// Records every message; fails any message containing one of `fail_on`.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail_on: Vec<String>,
}

impl RecordingNotifier {
    fn failing_on(needles: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_on: needles.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, text: &str) -> Result<()> {
        if self.fail_on.iter().any(|n| text.contains(n.as_str())) {
            anyhow::bail!("chat unavailable");
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn now() -> DateTime<Utc> {
    // A Monday, 09:15 UTC.
    Utc.with_ymd_and_hms(2026, 1, 12, 9, 15, 0).unwrap()
}

fn ev(source: Source, token: &str, kind: EventType, date: DateTime<Utc>) -> Event {
    Event::from_candidate(EventCandidate {
        kind,
        source,
        token: token.into(),
        title: format!("{token} event"),
        date,
        url: String::new(),
        details: String::new(),
    })
}

fn aggregator_with(events: Vec<Event>) -> Aggregator {
    let mut store = CacheStore::ephemeral();
    store.merge(events);
    Aggregator::new(store, vec![], SourcePriorities::default())
}

#[tokio::test]
async fn two_hour_alert_fires_once() {
    let agg = aggregator_with(vec![ev(
        Source::Binance,
        "FOO",
        EventType::Listing,
        now() + ChronoDuration::minutes(100),
    )]);
    let tg = RecordingNotifier::default();

    let first = dispatch::dispatch(&agg, &tg, Milestone::Alert2h, now()).await;
    assert_eq!(first, DispatchReport { selected: 1, delivered: 1, failed: 0 });

    let second = dispatch::dispatch(&agg, &tg, Milestone::Alert2h, now()).await;
    assert_eq!(second.selected, 0);
    assert_eq!(tg.sent().len(), 1);
    assert!(tg.sent()[0].contains("IN 2 HOURS"));
}

#[tokio::test]
async fn failed_delivery_is_isolated_and_retried() {
    let t = now() + ChronoDuration::hours(24);
    let agg = aggregator_with(vec![
        ev(Source::Binance, "GOOD", EventType::Unlock, t),
        ev(Source::Binance, "FLAKY", EventType::Unlock, t + ChronoDuration::minutes(5)),
        ev(Source::Okx, "ALSO", EventType::Launchpool, t + ChronoDuration::minutes(10)),
    ]);
    let flaky = RecordingNotifier::failing_on(&["FLAKY"]);

    let report = dispatch::dispatch(&agg, &flaky, Milestone::Alert24h, now()).await;
    assert_eq!(report, DispatchReport { selected: 3, delivered: 2, failed: 1 });

    let flags: Vec<(String, bool)> = agg
        .events()
        .into_iter()
        .map(|e| (e.token, e.sent_24h))
        .collect();
    assert!(flags.contains(&("GOOD".to_string(), true)));
    assert!(flags.contains(&("FLAKY".to_string(), false)));
    assert!(flags.contains(&("ALSO".to_string(), true)));

    // Next tick retries only the failed one.
    let healthy = RecordingNotifier::default();
    let retry = dispatch::dispatch(&agg, &healthy, Milestone::Alert24h, now()).await;
    assert_eq!(retry, DispatchReport { selected: 1, delivered: 1, failed: 0 });
    assert!(healthy.sent()[0].contains("FLAKY"));
}

#[tokio::test]
async fn digest_marks_everything_it_carried() {
    let agg = aggregator_with(vec![
        ev(Source::Binance, "PAST", EventType::Listing, now() - ChronoDuration::days(3)),
        ev(Source::Bybit, "SOON", EventType::Airdrop, now() + ChronoDuration::days(2)),
        ev(Source::Okx, "FAR", EventType::Unlock, now() + ChronoDuration::days(9)),
    ]);
    let tg = RecordingNotifier::default();

    let report = dispatch::dispatch(&agg, &tg, Milestone::Digest, now()).await;
    assert_eq!(report, DispatchReport { selected: 2, delivered: 2, failed: 0 });
    assert_eq!(tg.sent().len(), 1);

    let marked: Vec<_> = agg
        .events()
        .into_iter()
        .filter(|e| e.sent_digest)
        .map(|e| e.token)
        .collect();
    assert_eq!(marked, vec!["PAST".to_string(), "SOON".to_string()]);

    let again = dispatch::dispatch(&agg, &tg, Milestone::Digest, now()).await;
    assert_eq!(again.selected, 0);
    assert_eq!(tg.sent().len(), 1);
}

#[tokio::test]
async fn failed_digest_marks_nothing() {
    let agg = aggregator_with(vec![ev(
        Source::Binance,
        "FOO",
        EventType::Listing,
        now() + ChronoDuration::days(1),
    )]);
    let down = RecordingNotifier::failing_on(&["EVENTS OF THE WEEK"]);

    let report = dispatch::dispatch(&agg, &down, Milestone::Digest, now()).await;
    assert_eq!(report.failed, 1);
    assert!(agg.events().iter().all(|e| !e.sent_digest));
}

#[tokio::test]
async fn hourly_tick_runs_digest_only_in_slot() {
    let agg = aggregator_with(vec![ev(
        Source::Binance,
        "FOO",
        EventType::Listing,
        now() + ChronoDuration::hours(22),
    )]);
    let tg = RecordingNotifier::default();
    let schedule = DigestSchedule::parse("monday", "09:00").unwrap();

    let off_slot = now() + ChronoDuration::hours(1);
    let reports = dispatch::run_milestones(&agg, &tg, &schedule, off_slot).await;
    assert!(reports.iter().all(|(m, _)| *m != Milestone::Digest));

    let reports = dispatch::run_milestones(&agg, &tg, &schedule, now()).await;
    let milestones: Vec<_> = reports.iter().map(|(m, _)| *m).collect();
    assert_eq!(
        milestones,
        vec![Milestone::Digest, Milestone::Alert24h, Milestone::Alert2h]
    );
    let e = &agg.events()[0];
    assert!(e.sent_digest);
    assert!(e.sent_24h);
}

#[tokio::test]
async fn winner_id_is_what_gets_marked() {
    // Two sources cached for the same event; only the winner is alerted.
    let t = now() + ChronoDuration::minutes(120);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let on_disk = vec![
        ev(Source::Bybit, "FOO", EventType::Airdrop, t),
        ev(Source::Airdrops, "FOO", EventType::Airdrop, t),
    ];
    std::fs::write(&path, serde_json::to_vec(&on_disk).unwrap()).unwrap();
    let agg = Arc::new(Aggregator::new(
        CacheStore::load(&path),
        vec![],
        SourcePriorities::default(),
    ));
    let tg = RecordingNotifier::default();

    let report = dispatch::dispatch(&agg, &tg, Milestone::Alert2h, now()).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(tg.sent().len(), 1);

    let again = dispatch::dispatch(&agg, &tg, Milestone::Alert2h, now()).await;
    assert_eq!(again.selected, 0);
}

#[tokio::test]
async fn each_alert_kind_uses_its_own_message() {
    let agg = aggregator_with(vec![
        ev(Source::Okx, "DAY", EventType::Listing, now() + ChronoDuration::hours(24)),
        ev(Source::Okx, "SOON", EventType::Listing, now() + ChronoDuration::minutes(120)),
    ]);
    let tg = RecordingNotifier::default();

    dispatch::dispatch(&agg, &tg, Milestone::Alert24h, now()).await;
    dispatch::dispatch(&agg, &tg, Milestone::Alert2h, now()).await;

    let sent = tg.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("TOMORROW") && sent[0].contains("DAY event"));
    assert!(sent[1].contains("IN 2 HOURS") && sent[1].contains("SOON event"));
    assert!(!sent[1].contains("TOMORROW"));
}
