//! Vote counting and winner selection.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::ballot::Vote;
use super::options::VotingOptions;

/// Shape of the result, for logs and the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyOutcome {
    /// Every vote went to the winner.
    Unanimous,
    /// The winner holds more than half the votes.
    Majority,
    /// The winner leads without a majority.
    Plurality,
    /// The top count was shared and the tie-break decided.
    TieBroken,
    /// No votes were cast.
    NoVotes,
}

impl std::fmt::Display for TallyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unanimous => write!(f, "unanimous"),
            Self::Majority => write!(f, "majority"),
            Self::Plurality => write!(f, "plurality"),
            Self::TieBroken => write!(f, "tie_broken"),
            Self::NoVotes => write!(f, "no_votes"),
        }
    }
}

/// Label counts in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    counts: Vec<(String, usize)>,
}

impl VoteTally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        let mut tally = Self::default();
        for vote in votes {
            tally.add(&vote.decision);
        }
        tally
    }

    pub fn add(&mut self, label: &str) {
        match self.counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((label.to_string(), 1)),
        }
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts
            .iter()
            .find(|(l, _)| l == label)
            .map_or(0, |(_, c)| *c)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.counts
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Highest count wins. Ties go to the label listed earliest in `options`;
    /// labels outside the options rank after every option, in first-seen order.
    pub fn winner(&self, options: &VotingOptions) -> Option<&str> {
        self.counts
            .iter()
            .enumerate()
            .min_by_key(|(seen, (label, count))| {
                let rank = options.position(label).unwrap_or(usize::MAX);
                (std::cmp::Reverse(*count), rank, *seen)
            })
            .map(|(_, (label, _))| label.as_str())
    }

    pub fn outcome(&self, options: &VotingOptions) -> TallyOutcome {
        let Some(winner) = self.winner(options) else {
            return TallyOutcome::NoVotes;
        };
        let top = self.count(winner);
        let total = self.total();
        let tied = self.counts.iter().filter(|(_, c)| *c == top).count() > 1;

        if tied {
            TallyOutcome::TieBroken
        } else if top == total {
            TallyOutcome::Unanimous
        } else if top * 2 > total {
            TallyOutcome::Majority
        } else {
            TallyOutcome::Plurality
        }
    }

    /// `{"label": count, ...}` in first-seen order.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for VoteTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (label, count) in &self.counts {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}
