//! Telegram MarkdownV2 message builders.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::model::{Event, EventType};

/// Escape every character MarkdownV2 treats as markup.
pub fn escape_md2(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        if matches!(
            ch,
            '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                | '|' | '{' | '}' | '.' | '!' | '\\'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inside `(...)` of a link only `)` and `\` need escaping.
fn escape_md2_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

fn icon(kind: EventType) -> &'static str {
    match kind {
        EventType::Launchpool => "🌾",
        EventType::Listing => "🆕",
        EventType::Unlock => "🔓",
        EventType::Airdrop => "🪂",
    }
}

fn label(kind: EventType) -> &'static str {
    match kind {
        EventType::Launchpool => "LAUNCHPOOL",
        EventType::Listing => "LISTING",
        EventType::Unlock => "UNLOCK",
        EventType::Airdrop => "AIRDROP / TGE",
    }
}

fn link_line(e: &Event) -> Option<String> {
    (!e.url.is_empty()).then(|| format!("🔗 [Announcement]({})", escape_md2_url(&e.url)))
}

/// Weekly digest, grouped by event type.
pub fn format_digest(events: &[Event], from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let mut sb = String::new();
    let span = format!("{} – {}", from.format("%-d %b"), to.format("%-d %b %Y"));
    let _ = writeln!(sb, "📅 *EVENTS OF THE WEEK \\| {}*", escape_md2(&span));

    for kind in EventType::ALL {
        let section: Vec<&Event> = events.iter().filter(|e| e.kind == kind).collect();
        if section.is_empty() {
            continue;
        }
        let _ = writeln!(sb, "\n{} *{}*", icon(kind), escape_md2(label(kind)));
        for e in section {
            let mut line = format!(
                "• {} — {}: {}",
                escape_md2(&e.date.format("%-d %b").to_string()),
                escape_md2(e.source.label()),
                escape_md2(&e.title)
            );
            if !e.details.is_empty() {
                let _ = write!(line, " \\({}\\)", escape_md2(&e.details));
            }
            let _ = writeln!(sb, "{line}");
        }
    }

    sb.push_str("\nℹ️ Alerts follow 24h and 2h before each event\n");
    sb
}

pub fn format_alert_24h(e: &Event) -> String {
    let mut msg = format!("⏰ *TOMORROW \\| {}*\n", escape_md2(label(e.kind)));
    let _ = writeln!(msg, "{}", escape_md2(&e.title));
    let _ = writeln!(
        msg,
        "📅 {} UTC",
        escape_md2(&e.date.format("%-d %b %Y, %H:%M").to_string())
    );
    if let Some(link) = link_line(e) {
        let _ = writeln!(msg, "{link}");
    }
    msg
}

pub fn format_alert_2h(e: &Event) -> String {
    let mut msg = format!("🚨 *IN 2 HOURS \\| {}*\n", escape_md2(label(e.kind)));
    let _ = writeln!(
        msg,
        "{} starts at {} UTC",
        escape_md2(&e.title),
        escape_md2(&e.date.format("%H:%M").to_string())
    );
    if let Some(link) = link_line(e) {
        let _ = writeln!(msg, "{link}");
    }
    msg
}

/// Generic list used by on-demand views.
pub fn format_event_list(events: &[Event], header: &str) -> String {
    if events.is_empty() {
        return format!("{}\n\nNo events found\\.", escape_md2(header));
    }
    let mut sb = format!("*{}*\n", escape_md2(header));
    for e in events {
        let _ = writeln!(
            sb,
            "\n{} *{}* — {}",
            icon(e.kind),
            escape_md2(&e.token),
            escape_md2(&e.title)
        );
        let _ = writeln!(
            sb,
            "   📅 {} UTC",
            escape_md2(&e.date.format("%-d %b, %H:%M").to_string())
        );
        if !e.details.is_empty() {
            let _ = writeln!(sb, "   ℹ️ {}", escape_md2(&e.details));
        }
        if let Some(link) = link_line(e) {
            let _ = writeln!(sb, "   {link}");
        }
    }
    sb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventCandidate, Source};
    use chrono::TimeZone;

    fn listing() -> Event {
        Event::from_candidate(EventCandidate {
            kind: EventType::Listing,
            source: Source::Okx,
            token: "FOO".into(),
            title: "OKX lists FOO-USDT (spot)".into(),
            date: Utc.with_ymd_and_hms(2026, 1, 10, 8, 0, 0).unwrap(),
            url: "https://okx.example/a(1)".into(),
            details: "pairs: FOO/USDT".into(),
        })
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_md2("a.b-c(d)!"), "a\\.b\\-c\\(d\\)\\!");
        assert_eq!(escape_md2("plain"), "plain");
    }

    #[test]
    fn digest_groups_by_type_and_escapes() {
        let from = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 1, 12, 9, 0, 0).unwrap();
        let msg = format_digest(&[listing()], from, to);
        assert!(msg.contains("5 Jan – 12 Jan 2026"));
        assert!(msg.contains("*LISTING*"));
        assert!(msg.contains("OKX: OKX lists FOO\\-USDT \\(spot\\)"));
        assert!(msg.contains("\\(pairs: FOO/USDT\\)"));
    }

    #[test]
    fn alerts_carry_time_and_link() {
        let e = listing();
        let day = format_alert_24h(&e);
        assert!(day.contains("10 Jan 2026, 08:00 UTC"));
        assert!(day.contains("[Announcement](https://okx.example/a(1\\))"));
        let soon = format_alert_2h(&e);
        assert!(soon.contains("starts at 08:00 UTC"));
    }

    #[test]
    fn event_list_handles_empty() {
        assert_eq!(format_event_list(&[], "Today"), "Today\n\nNo events found\\.");
        assert!(format_event_list(&[listing()], "Today").contains("🆕 *FOO*"));
    }
}
