use std::time::Duration;

use rocket::{
    catch,
    http::{Header, Status},
    serde::json::Json,
    Request, Responder,
};

use super::{ErrorBody, INTERNAL_SERVER_ERROR};
use crate::rate_limit;

#[derive(Responder)]
#[response(status = 429, content_type = "json")]
pub struct TooManyRequests {
    body: Json<ErrorBody>,
    retry_after: Header<'static>,
}

#[catch(400)]
pub fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody::new("Bad Request").with_message("the request body is not valid JSON"))
}

#[catch(404)]
pub fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("Resource not found"))
}

#[catch(413)]
pub fn payload_too_large() -> Json<ErrorBody> {
    Json(ErrorBody::new("Payload Too Large"))
}

#[catch(422)]
pub fn unprocessable_entity() -> Json<ErrorBody> {
    Json(ErrorBody::new("Unprocessable Entity"))
}

#[catch(429)]
pub fn too_many_requests(request: &Request<'_>) -> TooManyRequests {
    let (message, retry_after) = match rate_limit::rejection(request) {
        Some(exceeded) => (exceeded.rule.to_string(), retry_after_secs(exceeded.retry_after)),
        None => (Status::TooManyRequests.reason_lossy().to_owned(), 1),
    };

    TooManyRequests {
        body: Json(ErrorBody::new("Too many requests").with_message(message)),
        retry_after: Header::new("Retry-After", retry_after.to_string()),
    }
}

/// Whole seconds a client must wait, rounded up so that waiting that long
/// is always enough.
fn retry_after_secs(wait: Duration) -> u64 {
    (wait.as_secs() + u64::from(wait.subsec_nanos() > 0)).max(1)
}

#[catch(500)]
pub fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new(INTERNAL_SERVER_ERROR))
}
