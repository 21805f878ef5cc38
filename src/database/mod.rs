use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

mod score;
mod store_error;

pub use score::{LeaderboardEntry, PlayerScore, ScoreId, ScoreRecord};
pub use store_error::*;

/// Number of records returned by a leaderboard query when no limit is given.
pub const DEFAULT_LEADERBOARD_SIZE: u32 = 20;

const MAX_CONNECTIONS: u32 = 8;

const CREATE_HIGH_SCORES: &str = "CREATE TABLE IF NOT EXISTS high_scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    player_name TEXT NOT NULL,
    score INTEGER NOT NULL,
    date TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

/// Append-only storage of submitted scores backed by a single SQLite file.
///
/// Every operation checks a connection out of the pool for its own duration;
/// the connection goes back to the pool when it is dropped, whichever way
/// the operation ends.
#[derive(Clone, Debug)]
pub struct ScoreStore {
    pool: SqlitePool,
}

impl ScoreStore {
    /// Opens (creating if needed) the database at `path` and makes sure the
    /// `high_scores` table exists. With `reset` set the table is dropped and
    /// recreated empty first.
    pub async fn initialize(path: &Path, reset: bool) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(StoreError::Unavailable)?;

        let store = Self { pool };
        store.bootstrap(reset).await.map_err(StoreError::Unavailable)?;
        info!(path = %path.display(), reset, "score store initialized");
        Ok(store)
    }

    async fn bootstrap(&self, reset: bool) -> Result<(), sqlx::Error> {
        let mut transaction = self.pool.begin().await?;
        if reset {
            warn!("dropping existing high_scores table");
            sqlx::query("DROP TABLE IF EXISTS high_scores")
                .execute(&mut *transaction)
                .await?;
        }
        sqlx::query(CREATE_HIGH_SCORES)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await
    }

    /// Appends a new record and returns the id the database assigned to it.
    pub async fn insert_score(&self, player_name: &str, score: PlayerScore) -> StoreResult<ScoreId> {
        let mut connection = self.pool.acquire().await?;
        let result = sqlx::query("INSERT INTO high_scores (player_name, score, date) VALUES (?, ?, ?)")
            .bind(player_name)
            .bind(score)
            .bind(Utc::now())
            .execute(&mut *connection)
            .await?;

        let id = result.last_insert_rowid();
        info!(id, player_name, score, "score saved");
        Ok(id)
    }

    /// Fetches up to `limit` records, highest score first.
    /// Equal scores are ordered by submission, earliest first.
    pub async fn top_scores(&self, limit: u32) -> StoreResult<Vec<ScoreRecord>> {
        let mut connection = self.pool.acquire().await?;
        let records = sqlx::query_as::<_, ScoreRecord>(
            "SELECT id, player_name, score, date FROM high_scores ORDER BY score DESC, id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&mut *connection)
        .await?;

        debug!(count = records.len(), limit, "retrieved top scores");
        Ok(records)
    }

    /// Waits for checked-out connections to come back, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("score store closed");
    }

    /// Number of distinct player names that ever submitted a score.
    pub async fn distinct_player_count(&self) -> StoreResult<i64> {
        let mut connection = self.pool.acquire().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT player_name) FROM high_scores")
            .fetch_one(&mut *connection)
            .await?;

        debug!(count, "counted distinct players");
        Ok(count)
    }
}
