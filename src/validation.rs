//! Structural and range checks on score submissions.

use rocket::serde::json::Value;
use thiserror::Error;

use crate::database::PlayerScore;

pub const MAX_PLAYER_NAME_LENGTH: usize = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Invalid score value")]
    InvalidScore,
    #[error("Invalid player name")]
    InvalidName,
}

/// A payload that passed validation. The name is kept exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub player_name: String,
    pub score: PlayerScore,
}

/// Checks a decoded `/save_score` body.
///
/// Missing fields are reported before a bad score, and a bad score before a
/// bad name. Names are not trimmed; an empty name is accepted.
pub fn validate_submission(payload: &Value) -> Result<Submission, SubmissionError> {
    let (player_name, score) = match payload {
        Value::Object(fields) => {
            let player_name = fields
                .get("player_name")
                .ok_or(SubmissionError::MissingField("player_name"))?;
            let score = fields
                .get("score")
                .ok_or(SubmissionError::MissingField("score"))?;
            (player_name, score)
        }
        _ => return Err(SubmissionError::MissingField("player_name")),
    };

    let score = score
        .as_i64()
        .filter(|score| *score >= 0)
        .ok_or(SubmissionError::InvalidScore)?;

    let player_name = match player_name {
        Value::String(name) if name.chars().count() <= MAX_PLAYER_NAME_LENGTH => name.clone(),
        _ => return Err(SubmissionError::InvalidName),
    };

    Ok(Submission { player_name, score })
}
