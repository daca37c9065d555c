//! # Source Priority
//!
//! Ranking used to pick the winning record when several feeds report the
//! same event. Lower number = higher priority.
//!
//! - Loaded from the `[priority]` table of the calendar config.
//! - Falls back to the built-in `default_seed()` when no table is given.
//! - A source missing from a loaded ranking gets [`UNRANKED`].
//!
//! The ranking is a business decision, so it is data, not code.

use serde::Deserialize;
use std::collections::HashMap;

use crate::model::Source;

/// Priority assigned to sources absent from the ranking.
pub const UNRANKED: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "HashMap<String, u32>")]
pub struct SourcePriorities {
    ranks: HashMap<Source, u32>,
}

impl TryFrom<HashMap<String, u32>> for SourcePriorities {
    type Error = anyhow::Error;

    fn try_from(raw: HashMap<String, u32>) -> Result<Self, Self::Error> {
        let ranks = raw
            .into_iter()
            .map(|(name, rank)| Ok((name.parse::<Source>()?, rank)))
            .collect::<anyhow::Result<HashMap<_, _>>>()?;
        Ok(Self { ranks })
    }
}

impl SourcePriorities {
    pub fn from_map(ranks: HashMap<Source, u32>) -> Self {
        Self { ranks }
    }

    /// Exchange-native feeds rank above the unlock/airdrop aggregators.
    pub fn default_seed() -> Self {
        let ranks = [
            (Source::Binance, 1),
            (Source::Bybit, 2),
            (Source::Okx, 3),
            (Source::TokenUnlocks, 4),
            (Source::Airdrops, 5),
        ]
        .into_iter()
        .collect();
        Self { ranks }
    }

    pub fn priority_for(&self, source: Source) -> u32 {
        self.ranks.get(&source).copied().unwrap_or(UNRANKED)
    }

    /// True when `a` strictly outranks `b`. Equal ranks never outrank.
    pub fn outranks(&self, a: Source, b: Source) -> bool {
        self.priority_for(a) < self.priority_for(b)
    }
}

impl Default for SourcePriorities {
    fn default() -> Self {
        Self::default_seed()
    }
}
