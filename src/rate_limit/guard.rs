use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr};

use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use tracing::{error, warn};

use super::{Endpoint, RateLimitExceeded, RateLimiter};

/// Marks which limits a route is subject to.
pub trait LimitClass: Send + Sync + 'static {
    const ENDPOINT: Endpoint;
}

pub struct DashboardLimits;
pub struct GameLimits;
pub struct SaveScoreLimits;
pub struct TopScoresLimits;
pub struct TotalPlayersLimits;

impl LimitClass for DashboardLimits {
    const ENDPOINT: Endpoint = Endpoint::Dashboard;
}

impl LimitClass for GameLimits {
    const ENDPOINT: Endpoint = Endpoint::Game;
}

impl LimitClass for SaveScoreLimits {
    const ENDPOINT: Endpoint = Endpoint::SaveScore;
}

impl LimitClass for TopScoresLimits {
    const ENDPOINT: Endpoint = Endpoint::TopScores;
}

impl LimitClass for TotalPlayersLimits {
    const ENDPOINT: Endpoint = Endpoint::TotalPlayers;
}

#[derive(Debug)]
pub enum AdmissionError {
    /// The rocket was built without a [`RateLimiter`] in managed state.
    Unmanaged,
    Exceeded(RateLimitExceeded),
}

/// Request guard that admits the request against the managed [`RateLimiter`].
///
/// On rejection the guard fails with `429 Too Many Requests` and leaves the
/// violated limit in the request-local cache for the catcher to report.
pub struct RateLimited<C: LimitClass>(PhantomData<C>);

/// Address used to bucket requests that carry no client address.
pub const FALLBACK_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// The socket peer's address. Forwarding headers such as `X-Real-IP` are
/// client-controlled and never consulted.
pub fn client_key(request: &Request<'_>) -> IpAddr {
    request
        .remote()
        .map(|address| address.ip())
        .unwrap_or(FALLBACK_CLIENT)
}

/// The limit that rejected this request, if any.
pub fn rejection(request: &Request<'_>) -> Option<RateLimitExceeded> {
    request
        .local_cache(|| None::<RateLimitExceeded>)
        .clone()
}

#[rocket::async_trait]
impl<'r, C: LimitClass> FromRequest<'r> for RateLimited<C> {
    type Error = AdmissionError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let limiter = match request.rocket().state::<RateLimiter>() {
            Some(limiter) => limiter,
            None => {
                error!("no rate limiter is managed, refusing request");
                return Outcome::Error((Status::InternalServerError, AdmissionError::Unmanaged));
            }
        };

        let client = client_key(request);
        match limiter.check(client, C::ENDPOINT) {
            Ok(()) => Outcome::Success(RateLimited(PhantomData)),
            Err(exceeded) => {
                warn!(
                    target: "security",
                    %client,
                    endpoint = ?C::ENDPOINT,
                    limit = %exceeded.rule,
                    "rate limit exceeded"
                );
                request.local_cache(|| Some(exceeded.clone()));
                Outcome::Error((Status::TooManyRequests, AdmissionError::Exceeded(exceeded)))
            }
        }
    }
}
