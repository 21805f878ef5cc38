use chrono::{DateTime, Utc};
use rocket::serde::{Deserialize, Serialize};

pub type PlayerScore = i64;
pub type ScoreId = i64;

/// A single row of the `high_scores` table.
/// Rows are append-only: nothing in the server updates or deletes them.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct ScoreRecord {
    pub id: ScoreId,
    pub player_name: String,
    pub score: PlayerScore,
    #[sqlx(rename = "date")]
    pub recorded_at: DateTime<Utc>,
}

/// Public view of a record as served by `/top_scores`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(crate = "rocket::serde")]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: PlayerScore,
    pub date: DateTime<Utc>,
}

impl From<ScoreRecord> for LeaderboardEntry {
    fn from(record: ScoreRecord) -> Self {
        Self {
            player_name: record.player_name,
            score: record.score,
            date: record.recorded_at,
        }
    }
}
