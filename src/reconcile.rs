//! Cross-source deduplication.
//!
//! Records sharing a [`GroupKey`] describe one real-world event. Exactly one
//! survives per group: the record from the best-ranked source, carrying the
//! union of every member's milestone flags.

use std::collections::HashMap;

use crate::model::{Event, GroupKey};
use crate::source_priority::SourcePriorities;

/// Collapse `events` to one winner per `(token, day, type)`.
///
/// Output order follows the first appearance of each key. On equal priority
/// the first-seen member wins.
pub fn reconcile(events: Vec<Event>, priorities: &SourcePriorities) -> Vec<Event> {
    let mut index: HashMap<GroupKey, usize> = HashMap::with_capacity(events.len());
    let mut groups: Vec<Vec<Event>> = Vec::new();

    for ev in events {
        let key = ev.group_key();
        match index.get(&key) {
            Some(&i) => groups[i].push(ev),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![ev]);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|group| pick_winner(group, priorities))
        .collect()
}

fn pick_winner(group: Vec<Event>, priorities: &SourcePriorities) -> Option<Event> {
    let mut members = group.into_iter();
    let mut winner = members.next()?;
    let mut losers = Vec::new();

    for ev in members {
        if priorities.outranks(ev.source, winner.source) {
            losers.push(std::mem::replace(&mut winner, ev));
        } else {
            losers.push(ev);
        }
    }

    for loser in &losers {
        winner.absorb_flags(loser);
    }
    Some(winner)
}
