//! Process configuration read from the environment (and `.env`).

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::rate_limit::{Endpoint, LimitPolicy, LimitRule, RuleParseError};

pub const DEFAULT_SECRET_KEY: &str = "dev-key-please-change-in-production";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Testing,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "default" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "testing" => Ok(Self::Testing),
            _ => Err(ConfigError::UnknownEnvironment(name.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown APP_ENV `{0}`, expected development, production or testing")]
    UnknownEnvironment(String),
    #[error("{key} must be a boolean, got `{value}`")]
    InvalidBool { key: &'static str, value: String },
    #[error("{key} is not a valid rate limit: {source}")]
    InvalidRateLimit {
        key: &'static str,
        #[source]
        source: RuleParseError,
    },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub database_path: PathBuf,
    pub secret_key: String,
    pub debug: bool,
    /// Drop and recreate the score table at startup, losing all history.
    pub reset_database_on_start: bool,
    pub rate_limiting_enabled: bool,
    pub rate_limits: LimitPolicy,
}

const RATE_LIMIT_KEYS: [(&str, Option<Endpoint>); 4] = [
    ("RATELIMIT_DEFAULT", None),
    ("RATELIMIT_SAVE_SCORE", Some(Endpoint::SaveScore)),
    ("RATELIMIT_TOP_SCORES", Some(Endpoint::TopScores)),
    ("RATELIMIT_TOTAL_PLAYERS", Some(Endpoint::TotalPlayers)),
];

impl Config {
    /// Reads the configuration from the process environment,
    /// after loading `.env` if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV") {
            Some(name) => name.parse()?,
            None => Environment::Development,
        };

        let database_path = lookup("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| match environment {
                Environment::Testing => PathBuf::from("test_game.db"),
                _ => PathBuf::from("game.db"),
            });

        let secret_key = lookup("SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_owned());

        let flag = |key: &'static str, default: bool| match lookup(key) {
            Some(value) => parse_bool(key, &value),
            None => Ok(default),
        };
        let debug = flag("DEBUG", environment == Environment::Development)?;
        let reset_database_on_start =
            flag("RESET_DATABASE_ON_START", environment == Environment::Testing)?;
        let rate_limiting_enabled = flag("RATELIMIT_ENABLED", true)?;

        let mut rate_limits = LimitPolicy::default();
        for (key, endpoint) in RATE_LIMIT_KEYS {
            let rules = match lookup(key) {
                Some(rules) => LimitRule::parse_list(&rules)
                    .map_err(|source| ConfigError::InvalidRateLimit { key, source })?,
                None => continue,
            };
            rate_limits = match endpoint {
                Some(endpoint) => rate_limits.with_override(endpoint, rules),
                None => rate_limits.with_default(rules),
            };
        }

        Ok(Self {
            environment,
            database_path,
            secret_key,
            debug,
            reset_database_on_start,
            rate_limiting_enabled,
            rate_limits,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_owned(),
        }),
    }
}
