use rocket::{catchers, routes, Catcher, Route};

mod catchers;
mod headers;
mod pages;
mod request_error;
pub mod requests;

pub use headers::{Cors, SecurityHeaders};
pub use request_error::*;

/// Every route the server answers, mounted at `/`.
pub fn routes() -> Vec<Route> {
    routes![
        pages::dashboard,
        pages::game,
        requests::save_score,
        requests::top_scores,
        requests::total_players,
        headers::preflight,
    ]
}

pub fn catchers() -> Vec<Catcher> {
    catchers![
        catchers::bad_request,
        catchers::not_found,
        catchers::payload_too_large,
        catchers::unprocessable_entity,
        catchers::too_many_requests,
        catchers::internal_error,
    ]
}
