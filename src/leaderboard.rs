use rocket::serde::{self, Deserialize, Serialize};

use crate::database::{LeaderboardEntry, ScoreRecord};

/// Ranked view over stored scores, serialized as a plain JSON array.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    #![allow(dead_code)]

    /// Wraps records that the store already returned in rank order:
    /// score descending, then id ascending.
    pub fn from_records(records: Vec<ScoreRecord>) -> Self {
        debug_assert!(
            records.windows(2).all(|pair| ranks_before(&pair[0], &pair[1])),
            "records out of rank order"
        );
        Self {
            entries: records.into_iter().map(LeaderboardEntry::from).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &LeaderboardEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether no entry outscores the one before it.
    pub fn is_ranked(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score)
    }
}

/// Higher scores first; equal scores keep insertion order.
fn ranks_before(first: &ScoreRecord, second: &ScoreRecord) -> bool {
    first.score > second.score || (first.score == second.score && first.id < second.id)
}

impl Serialize for Leaderboard {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Leaderboard {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self {
            entries: Vec::deserialize(deserializer)?,
        })
    }
}
