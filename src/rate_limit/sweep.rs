use std::time::{Duration, Instant};

use rocket::fairing::AdHoc;
use tracing::debug;

use super::RateLimiter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Once the server is up, periodically drops limiter windows that have run out.
pub fn sweeper() -> AdHoc {
    AdHoc::on_liftoff("Rate limit sweeper", |rocket| {
        Box::pin(async move {
            let limiter = match rocket.state::<RateLimiter>() {
                Some(limiter) => limiter.clone(),
                None => return,
            };

            let shutdown = rocket.shutdown();
            tokio::spawn(async move {
                tokio::pin!(shutdown);
                let mut interval = tokio::time::interval(SWEEP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            limiter.purge_expired(Instant::now());
                            debug!(tracked = limiter.tracked(), "swept rate limit windows");
                        }
                        _ = &mut shutdown => break,
                    }
                }
            });
        })
    })
}
