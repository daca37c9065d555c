//! Notification windows over a reconciled event set.
//!
//! Pure functions: the caller passes the events and `now`. All results are
//! sorted by ascending date. Milestone queries (`digest`, `alert_24h`,
//! `alert_2h`) skip records whose flag is already set; the on-demand views
//! are repeatable and ignore flags.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};

use crate::model::{Event, EventType, Milestone};

pub const DIGEST_LOOKBACK_DAYS: i64 = 14;
pub const DIGEST_LOOKAHEAD_DAYS: i64 = 7;
pub const ALERT_24H_FROM_HOURS: i64 = 20;
pub const ALERT_24H_TO_HOURS: i64 = 28;
pub const ALERT_2H_FROM_MINUTES: i64 = 90;
pub const ALERT_2H_TO_MINUTES: i64 = 150;
pub const UPCOMING_DAYS: i64 = 30;

/// Digest: [-14d, +7d], not yet included in a digest.
pub fn digest(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let (from, to) = digest_bounds(now);
    select(events, |e| !e.sent_digest && within(e, from, to))
}

/// 24h alert: [+20h, +28h], not yet alerted.
pub fn alert_24h(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let from = now + ChronoDuration::hours(ALERT_24H_FROM_HOURS);
    let to = now + ChronoDuration::hours(ALERT_24H_TO_HOURS);
    select(events, |e| !e.sent_24h && within(e, from, to))
}

/// 2h alert: [+90min, +150min], listings and airdrops only, not yet alerted.
pub fn alert_2h(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let from = now + ChronoDuration::minutes(ALERT_2H_FROM_MINUTES);
    let to = now + ChronoDuration::minutes(ALERT_2H_TO_MINUTES);
    select(events, |e| {
        matches!(e.kind, EventType::Listing | EventType::Airdrop)
            && !e.sent_2h
            && within(e, from, to)
    })
}

/// Route a milestone to its query.
pub fn due(events: &[Event], milestone: Milestone, now: DateTime<Utc>) -> Vec<Event> {
    match milestone {
        Milestone::Digest => digest(events, now),
        Milestone::Alert24h => alert_24h(events, now),
        Milestone::Alert2h => alert_2h(events, now),
    }
}

/// Everything in [00:00 UTC today, 00:00 UTC tomorrow).
pub fn today(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let start = start_of_day(now);
    select(events, |e| e.date >= start && e.date < start + ChronoDuration::days(1))
}

/// Everything in [00:00 UTC tomorrow, 00:00 UTC the day after).
pub fn tomorrow(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let start = start_of_day(now) + ChronoDuration::days(1);
    select(events, |e| e.date >= start && e.date < start + ChronoDuration::days(1))
}

/// Same span as the digest, flags ignored.
pub fn week(events: &[Event], now: DateTime<Utc>) -> Vec<Event> {
    let (from, to) = digest_bounds(now);
    select(events, |e| within(e, from, to))
}

/// Events of `kind` in (now, now + 30d].
pub fn upcoming(events: &[Event], kind: EventType, now: DateTime<Utc>) -> Vec<Event> {
    let to = now + ChronoDuration::days(UPCOMING_DAYS);
    select(events, |e| e.kind == kind && e.date > now && e.date <= to)
}

fn digest_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - ChronoDuration::days(DIGEST_LOOKBACK_DAYS),
        now + ChronoDuration::days(DIGEST_LOOKAHEAD_DAYS),
    )
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn within(e: &Event, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    e.date >= from && e.date <= to
}

fn select(events: &[Event], keep: impl Fn(&Event) -> bool) -> Vec<Event> {
    let mut out: Vec<Event> = events.iter().filter(|e| keep(e)).cloned().collect();
    out.sort_by_key(|e| e.date);
    out
}
