use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Method, Status},
    options, Request, Response,
};

const SECURITY_HEADERS: [(&str, &str); 8] = [
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "SAMEORIGIN"),
    ("X-XSS-Protection", "1; mode=block"),
    (
        "Content-Security-Policy",
        "default-src 'self' 'unsafe-inline' 'unsafe-eval' https://fonts.googleapis.com https://fonts.gstatic.com",
    ),
    ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
    ("X-Permitted-Cross-Domain-Policies", "none"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"),
];

/// Stamps the fixed set of security headers onto every response,
/// replacing any value a handler or catcher set.
pub struct SecurityHeaders;

impl SecurityHeaders {
    #[cfg(test)]
    pub fn headers() -> impl Iterator<Item = (&'static str, &'static str)> {
        SECURITY_HEADERS.into_iter()
    }
}

#[rocket::async_trait]
impl Fairing for SecurityHeaders {
    fn info(&self) -> Info {
        Info {
            name: "Security headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        for (name, value) in SECURITY_HEADERS {
            response.set_header(Header::new(name, value));
        }
    }
}

const PREFLIGHT_MAX_AGE: &str = "86400";

/// Lets pages served from any origin call the API. Preflight requests get
/// the allowed methods and echo back the headers they asked for.
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Cross-origin access",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        if request.method() != Method::Options {
            return;
        }

        let requested = request
            .headers()
            .get_one("Access-Control-Request-Headers")
            .unwrap_or("Content-Type")
            .to_owned();
        response.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        response.set_header(Header::new("Access-Control-Allow-Headers", requested));
        response.set_header(Header::new("Access-Control-Max-Age", PREFLIGHT_MAX_AGE));
    }
}

/// Answers CORS preflight requests for any path; [`Cors`] adds the headers.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
