use rocket::{
    fairing::{Fairing, Info, Kind},
    Request, Response,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::{config::Config, rate_limit};

/// Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// the level implied by `config.debug`. Later calls are no-ops.
pub fn init(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Logs every failed request on the `security` target.
pub struct RequestAudit;

#[rocket::async_trait]
impl Fairing for RequestAudit {
    fn info(&self) -> Info {
        Info {
            name: "Request audit",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let status = response.status();
        if status.code >= 400 {
            warn!(
                target: "security",
                method = %request.method(),
                uri = %request.uri(),
                status = status.code,
                client = %rate_limit::client_key(request),
                "request failed"
            );
        }
    }
}
