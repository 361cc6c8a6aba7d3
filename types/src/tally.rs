//! Derived per-option vote counts for a category.
//!
//! A tally is never persisted. It is recomputed from the votes that reference
//! the category, so it always equals the count of matching vote records.

use crate::{Vote, VoteOption};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(rename = "A")]
    pub a: u64,
    #[serde(rename = "B")]
    pub b: u64,
    #[serde(rename = "C")]
    pub c: u64,
    #[serde(rename = "D")]
    pub d: u64,
    pub total: u64,
}

impl Tally {
    /// `{A:0, B:0, C:0, D:0, total:0}`.
    pub fn zeroed() -> Self {
        Self::default()
    }

    /// Count the given votes. Callers pass only votes of one category.
    pub fn from_votes<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Self {
        let mut tally = Self::zeroed();
        for vote in votes {
            tally.record(vote.option);
        }
        tally
    }

    pub fn record(&mut self, option: VoteOption) {
        match option {
            VoteOption::A => self.a += 1,
            VoteOption::B => self.b += 1,
            VoteOption::C => self.c += 1,
            VoteOption::D => self.d += 1,
        }
        self.total += 1;
    }

    pub fn get(&self, option: VoteOption) -> u64 {
        match option {
            VoteOption::A => self.a,
            VoteOption::B => self.b,
            VoteOption::C => self.c,
            VoteOption::D => self.d,
        }
    }

    /// The option with the most votes. Ties resolve to the earlier letter;
    /// an empty tally has no leader.
    pub fn leader(&self) -> Option<VoteOption> {
        if self.total == 0 {
            return None;
        }
        let mut best = VoteOption::A;
        for option in VoteOption::ALL {
            if self.get(option) > self.get(best) {
                best = option;
            }
        }
        Some(best)
    }
}
