use anyhow::Context;
use rocket::{fairing::AdHoc, Build, Rocket};
use tracing::{info, warn};

mod api;
mod config;
mod database;
mod leaderboard;
mod logging;
mod rate_limit;
mod validation;
#[cfg(test)]
mod tests;

use config::{Config, Environment};
use database::{ScoreStore, StoreResult};
use rate_limit::RateLimiter;

/// Opens the score store and assembles the server. Fails only if the store
/// cannot be opened.
pub async fn build(config: &Config) -> StoreResult<Rocket<Build>> {
    let store = ScoreStore::initialize(&config.database_path, config.reset_database_on_start).await?;

    let limiter = if config.rate_limiting_enabled {
        RateLimiter::new(config.rate_limits.clone())
    } else {
        warn!("rate limiting is disabled");
        RateLimiter::disabled()
    };

    Ok(rocket::build()
        .mount("/", api::routes())
        .mount("/static", rocket::fs::FileServer::from(rocket::fs::relative!("static")))
        .register("/", api::catchers())
        .attach(api::SecurityHeaders)
        .attach(api::Cors)
        .attach(logging::RequestAudit)
        .attach(rate_limit::sweeper())
        .attach(AdHoc::on_shutdown("Close score store", |rocket| {
            Box::pin(async move {
                if let Some(store) = rocket.state::<ScoreStore>() {
                    store.close().await;
                }
            })
        }))
        .manage(store)
        .manage(limiter))
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    logging::init(&config);

    if config.environment == Environment::Production && config.uses_default_secret() {
        warn!(target: "security", "SECRET_KEY is not set, using the development key");
    }
    info!(environment = ?config.environment, database = %config.database_path.display(), "starting");

    let rocket = build(&config)
        .await
        .context("failed to initialize the score store")?;

    if let Err(error) = rocket.launch().await {
        return Err(anyhow::anyhow!("server failed: {}", error));
    }
    Ok(())
}
