use rocket::serde::{json::Json, json::Value, Deserialize, Serialize};
use rocket::{get, post, State};

use super::*;
use crate::database::{ScoreStore, DEFAULT_LEADERBOARD_SIZE};
use crate::leaderboard::Leaderboard;
use crate::rate_limit::{RateLimited, SaveScoreLimits, TopScoresLimits, TotalPlayersLimits};
use crate::validation::validate_submission;

/// Largest leaderboard a client may ask for.
pub const MAX_LEADERBOARD_SIZE: u32 = 100;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(crate = "rocket::serde")]
pub struct SaveScoreResponse {
    pub success: bool,
}

/// Validates the submitted `{player_name, score}` body and stores it.
#[post("/save_score", data = "<payload>")]
pub async fn save_score(
    _admitted: RateLimited<SaveScoreLimits>,
    payload: Json<Value>,
    store: &State<ScoreStore>,
) -> RequestResult<Json<SaveScoreResponse>> {
    let submission = validate_submission(&payload)?;

    store
        .insert_score(&submission.player_name, submission.score)
        .await?;

    Ok(Json(SaveScoreResponse { success: true }))
}

/// Returns the highest scores, best first.
/// `limit` defaults to 20 and is clamped to `1..=100`.
#[get("/top_scores?<limit>")]
pub async fn top_scores(
    _admitted: RateLimited<TopScoresLimits>,
    limit: Option<u32>,
    store: &State<ScoreStore>,
) -> RequestResult<Json<Leaderboard>> {
    let limit = limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);

    let records = store.top_scores(limit).await?;
    Ok(Json(Leaderboard::from_records(records)))
}

/// Returns the number of distinct player names seen so far.
#[get("/total_players")]
pub async fn total_players(
    _admitted: RateLimited<TotalPlayersLimits>,
    store: &State<ScoreStore>,
) -> RequestResult<Json<i64>> {
    let count = store.distinct_player_count().await?;
    Ok(Json(count))
}
