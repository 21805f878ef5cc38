use rocket::{
    http::Status,
    response::{self, Responder},
    serde::{json::Json, Serialize},
    Request,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::{database::StoreError, validation::SubmissionError};

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    InvalidSubmission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type RequestResult<T, E = RequestError> = std::result::Result<T, E>;

/// JSON body of every error response.
#[derive(Serialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<'r> Responder<'r, 'static> for RequestError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        match self {
            Self::InvalidSubmission(err) => {
                warn!(uri = %request.uri(), error = %err, "rejected score submission");
                (Status::BadRequest, Json(ErrorBody::new(err.to_string()))).respond_to(request)
            }
            // Storage details stay in the server log.
            Self::Storage(err) => {
                error!(uri = %request.uri(), error = ?err, "storage failure");
                (Status::InternalServerError, Json(ErrorBody::new(INTERNAL_SERVER_ERROR)))
                    .respond_to(request)
            }
        }
    }
}
