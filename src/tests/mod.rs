use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rand::{distributions::Alphanumeric, seq::SliceRandom, thread_rng, Rng};
use rocket::{
    http::{ContentType, Header, Status},
    local::asynchronous::{Client, LocalResponse},
    serde::json::{json, Value},
};

use crate::{
    api::requests::SaveScoreResponse,
    api::SecurityHeaders,
    config::Config,
    leaderboard::Leaderboard,
};


/// A uniquely named SQLite file in the temp directory, removed on drop.
pub struct ScratchDatabase {
    path: PathBuf,
}

impl ScratchDatabase {
    pub fn new() -> Self {
        let suffix: String = thread_rng()
            .sample_iter(Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let path = std::env::temp_dir().join(format!("snake_leaderboard_{}.db", suffix));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut path = self.path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

fn test_config(database: &ScratchDatabase, extra: &[(&str, &str)]) -> Config {
    let database_path = database.path().to_string_lossy().into_owned();
    Config::from_lookup(|key| match key {
        "APP_ENV" => Some("testing".to_owned()),
        "DATABASE_PATH" => Some(database_path.clone()),
        _ => extra
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string()),
    })
    .expect("valid test configuration")
}

async fn spawn_client_with(database: &ScratchDatabase, extra: &[(&str, &str)]) -> Client {
    let rocket = super::build(&test_config(database, extra))
        .await
        .expect("score store opens");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

async fn spawn_client(database: &ScratchDatabase) -> Client {
    spawn_client_with(database, &[]).await
}

async fn deserialize_response<'a, T: rocket::serde::DeserializeOwned>(
    response: LocalResponse<'a>,
) -> rocket::serde::json::serde_json::Result<T> {
    let string = response.into_string().await.unwrap_or_default();
    rocket::serde::json::serde_json::from_str(&string)
}

/// Posts `payload` to `/save_score` as if sent from `remote`.
async fn save_score<'a>(client: &'a Client, remote: SocketAddr, payload: &Value) -> LocalResponse<'a> {
    client
        .post("/save_score")
        .remote(remote)
        .json(payload)
        .dispatch()
        .await
}

async fn top_scores(client: &Client, uri: &str) -> Leaderboard {
    let response = client.get(uri.to_owned()).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    deserialize_response(response).await.unwrap()
}

async fn total_players(client: &Client) -> i64 {
    let response = client.get("/total_players").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    deserialize_response(response).await.unwrap()
}

fn remote(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40000))
}

/// Submits a score, reads it back from the leaderboard, and counts players
#[rocket::async_test]
async fn submit_then_read_back() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    assert!(top_scores(&client, "/top_scores").await.is_empty());
    assert_eq!(total_players(&client).await, 0);

    let response = save_score(&client, remote(1), &json!({ "player_name": "Ada", "score": 42 })).await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let body: SaveScoreResponse = deserialize_response(response).await.unwrap();
    assert_eq!(body, SaveScoreResponse { success: true });

    let leaderboard = top_scores(&client, "/top_scores").await;
    let entries: Vec<_> = leaderboard.iter().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].player_name, "Ada");
    assert_eq!(entries[0].score, 42);

    assert_eq!(total_players(&client).await, 1);
}

/// Repeat submissions under one name count as one player
#[rocket::async_test]
async fn player_count_ignores_repeat_submissions() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for (name, score) in [("Ada", 1), ("Grace", 2), ("Ada", 3), ("ada", 4), ("Ada", 5)] {
        let response = save_score(&client, remote(1), &json!({ "player_name": name, "score": score })).await;
        assert_eq!(response.status(), Status::Ok);
    }

    assert_eq!(total_players(&client).await, 3);
    assert_eq!(top_scores(&client, "/top_scores").await.len(), 5);
}

/// The leaderboard comes back ranked and honours its limit
#[rocket::async_test]
async fn leaderboard_is_ranked_and_limited() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    let mut scores: Vec<i64> = (0..25).map(|_| thread_rng().gen_range(0..1000)).collect();
    scores.shuffle(&mut thread_rng());
    for (i, score) in scores.iter().enumerate() {
        let payload = json!({ "player_name": format!("player{}", i), "score": score });
        let response = save_score(&client, remote(1), &payload).await;
        assert_eq!(response.status(), Status::Ok);
    }

    let leaderboard = top_scores(&client, "/top_scores").await;
    assert_eq!(leaderboard.len(), 20);
    assert!(leaderboard.is_ranked());

    scores.sort_unstable_by(|a, b| b.cmp(a));
    let top: Vec<i64> = leaderboard.iter().map(|entry| entry.score).collect();
    assert_eq!(top, scores[..20]);

    assert_eq!(top_scores(&client, "/top_scores?limit=5").await.len(), 5);
    assert_eq!(top_scores(&client, "/top_scores?limit=0").await.len(), 1);
    assert_eq!(top_scores(&client, "/top_scores?limit=500").await.len(), 25);
}

/// Bad payloads are rejected with a descriptive 400 and never stored
#[rocket::async_test]
async fn invalid_submissions_are_rejected() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    let cases = [
        (json!({ "player_name": "A", "score": -1 }), "Invalid score value"),
        (json!({ "score": 5 }), "Missing field: player_name"),
        (json!({ "player_name": "A" }), "Missing field: score"),
        (json!({ "player_name": "x".repeat(51), "score": 5 }), "Invalid player name"),
        (json!({ "player_name": "A", "score": "5" }), "Invalid score value"),
    ];

    for (payload, message) in cases {
        let response = save_score(&client, remote(1), &payload).await;
        assert_eq!(response.status(), Status::BadRequest, "payload {}", payload);
        let body: Value = deserialize_response(response).await.unwrap();
        assert_eq!(body, json!({ "error": message }));
    }

    let response = client
        .post("/save_score")
        .header(ContentType::JSON)
        .body("{\"player_name\": ")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body["error"], "Bad Request");

    assert_eq!(total_players(&client).await, 0);
}

/// The 31st submission within a minute is turned away with a 429
#[rocket::async_test]
async fn submissions_are_rate_limited() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for score in 0..30 {
        let response = save_score(&client, remote(7), &json!({ "player_name": "Ada", "score": score })).await;
        assert_eq!(response.status(), Status::Ok);
    }

    let response = save_score(&client, remote(7), &json!({ "player_name": "Ada", "score": 30 })).await;
    assert_eq!(response.status(), Status::TooManyRequests);
    assert!(response.headers().get_one("Retry-After").is_some());
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "Too many requests", "message": "30 per 1 minute" })
    );

    // Another client still has its full allowance.
    let response = save_score(&client, remote(8), &json!({ "player_name": "Grace", "score": 1 })).await;
    assert_eq!(response.status(), Status::Ok);

    // Reads are limited separately from writes.
    let response = client.get("/top_scores").remote(remote(7)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    assert_eq!(top_scores(&client, "/top_scores?limit=100").await.len(), 31);
}

/// Forwarding headers cannot move a client into a fresh bucket
#[rocket::async_test]
async fn spoofed_forwarding_header_does_not_change_bucket() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for score in 0..31u8 {
        let response = client
            .post("/save_score")
            .remote(remote(7))
            .header(Header::new("X-Real-IP", format!("192.0.2.{}", score)))
            .json(&json!({ "player_name": "Mallory", "score": score }))
            .dispatch()
            .await;
        let expected = if score < 30 { Status::Ok } else { Status::TooManyRequests };
        assert_eq!(response.status(), expected, "submission {}", score + 1);
    }
}

/// Each page has its own allowance
#[rocket::async_test]
async fn pages_are_limited_separately() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for _ in 0..50 {
        let response = client.get("/").remote(remote(5)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }
    let response = client.get("/").remote(remote(5)).dispatch().await;
    assert_eq!(response.status(), Status::TooManyRequests);
    assert_eq!(response.headers().get_one("Retry-After"), Some("3600"));

    let response = client.get("/game").remote(remote(5)).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

/// Admission happens before the body is looked at
#[rocket::async_test]
async fn rate_limit_applies_before_validation() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for _ in 0..30 {
        let response = save_score(&client, remote(3), &json!({ "score": -1 })).await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    let response = save_score(&client, remote(3), &json!({ "player_name": "Ada", "score": 1 })).await;
    assert_eq!(response.status(), Status::TooManyRequests);
    assert_eq!(total_players(&client).await, 0);
}

/// Reads allow 60 requests a minute per client
#[rocket::async_test]
async fn reads_are_rate_limited() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for _ in 0..60 {
        let response = client.get("/total_players").remote(remote(9)).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
    }
    let response = client.get("/total_players").remote(remote(9)).dispatch().await;
    assert_eq!(response.status(), Status::TooManyRequests);
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body["message"], "60 per 1 minute");
}

/// With limiting switched off nothing is turned away
#[rocket::async_test]
async fn rate_limiting_can_be_disabled() {
    let database = ScratchDatabase::new();
    let client = spawn_client_with(&database, &[("RATELIMIT_ENABLED", "false")]).await;

    for score in 0..40 {
        let response = save_score(&client, remote(1), &json!({ "player_name": "Ada", "score": score })).await;
        assert_eq!(response.status(), Status::Ok);
    }
}

/// Storage failures surface as an opaque 500
#[rocket::async_test]
async fn storage_failure_is_opaque() {
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::{ConnectOptions, Connection};

    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    let mut connection = SqliteConnectOptions::new()
        .filename(database.path())
        .connect()
        .await
        .unwrap();
    sqlx::query("DROP TABLE high_scores")
        .execute(&mut connection)
        .await
        .unwrap();
    connection.close().await.unwrap();

    let response = client.get("/top_scores").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error" }));

    let response = save_score(&client, remote(1), &json!({ "player_name": "Ada", "score": 1 })).await;
    assert_eq!(response.status(), Status::InternalServerError);
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Internal Server Error" }));
}

/// Pages render and every response carries the security headers
#[rocket::async_test]
async fn pages_and_security_headers() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    for uri in ["/", "/game"] {
        let response = client.get(uri).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.content_type(), Some(ContentType::HTML));
        for (name, value) in SecurityHeaders::headers() {
            assert_eq!(response.headers().get_one(name), Some(value), "{} on {}", name, uri);
        }
        assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("*"));
    }

    let response = client.get("/static/js/snake.js").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = client.get("/no/such/page").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    for (name, value) in SecurityHeaders::headers() {
        assert_eq!(response.headers().get_one(name), Some(value));
    }
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Resource not found" }));
}

/// Browsers on other origins may preflight and then call the API
#[rocket::async_test]
async fn cross_origin_requests_are_allowed() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    let response = client
        .options("/save_score")
        .header(Header::new("Origin", "https://arcade.example"))
        .header(Header::new("Access-Control-Request-Method", "POST"))
        .header(Header::new("Access-Control-Request-Headers", "content-type"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);
    let headers = response.headers();
    assert_eq!(headers.get_one("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(headers.get_one("Access-Control-Allow-Methods"), Some("GET, POST, OPTIONS"));
    assert_eq!(headers.get_one("Access-Control-Allow-Headers"), Some("content-type"));
    assert!(headers.get_one("Access-Control-Max-Age").is_some());

    let response = save_score(&client, remote(1), &json!({ "player_name": "Ada", "score": 1 })).await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("*"));

    let response = client.get("/total_players").dispatch().await;
    assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), Some("*"));
}

/// Oversized bodies get a JSON 413 and nothing is stored
#[rocket::async_test]
async fn oversized_submission_is_rejected() {
    let database = ScratchDatabase::new();
    let client = spawn_client(&database).await;

    let padding = "x".repeat(1_100_000);
    let response = save_score(&client, remote(1), &json!({ "player_name": "Ada", "score": 1, "padding": padding })).await;
    assert_eq!(response.status(), Status::PayloadTooLarge);
    assert_eq!(response.content_type(), Some(ContentType::JSON));
    let body: Value = deserialize_response(response).await.unwrap();
    assert_eq!(body, json!({ "error": "Payload Too Large" }));

    assert_eq!(total_players(&client).await, 0);
}
