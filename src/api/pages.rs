use rocket::{get, response::content::RawHtml};

use crate::rate_limit::{DashboardLimits, GameLimits, RateLimited};

const DASHBOARD: &str = include_str!("../../templates/dashboard.html");
const GAME: &str = include_str!("../../templates/game.html");

#[get("/")]
pub fn dashboard(_admitted: RateLimited<DashboardLimits>) -> RawHtml<&'static str> {
    RawHtml(DASHBOARD)
}

#[get("/game")]
pub fn game(_admitted: RateLimited<GameLimits>) -> RawHtml<&'static str> {
    RawHtml(GAME)
}
