//! Session token integration tests
//!
//! Tokens are minted with `jsonwebtoken`, an independent HS256 implementation,
//! and presented to the server as a bearer header or as a session cookie.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::Value;

use circlecast::configuration::AuthSettings;
use circlecast::startup::run;
use circlecast::users::InMemoryUserStore;

const SECRET_NAME: &str = "CIRCLECAST_SESSION_TEST_SECRET";
const SECRET: &str = "integration-test-secret";

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    handle: Option<&'a str>,
    exp: i64,
}

fn settings_with_secret(secret: Option<&str>) -> AuthSettings {
    let mut secrets = HashMap::new();
    if let Some(secret) = secret {
        secrets.insert(SECRET_NAME.to_string(), secret.to_string());
    }
    AuthSettings {
        secret_names: vec![SECRET_NAME.to_string()],
        secrets,
        ..AuthSettings::default()
    }
}

fn spawn_app(settings: AuthSettings) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = run(listener, Arc::new(InMemoryUserStore::new()), settings)
        .expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

fn in_one_hour() -> i64 {
    chrono::Utc::now().timestamp() + 3600
}

fn mint(algorithm: Algorithm, key: &EncodingKey, sub: &str, handle: Option<&str>) -> String {
    let claims = TestClaims {
        sub,
        handle,
        exp: in_one_hour(),
    };
    encode(&Header::new(algorithm), &claims, key).expect("Failed to mint token")
}

fn mint_hs256(sub: &str) -> String {
    mint(
        Algorithm::HS256,
        &EncodingKey::from_secret(SECRET.as_bytes()),
        sub,
        None,
    )
}

async fn session(addr: &str, request: reqwest::RequestBuilder) -> Value {
    let response = request.send().await.expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200, "session lookup at {}", addr);
    response.json().await.unwrap()
}

#[tokio::test]
async fn bearer_token_resolves_identity() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let token = mint(
        Algorithm::HS256,
        &EncodingKey::from_secret(SECRET.as_bytes()),
        "user-1",
        Some("ada"),
    );

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(&token),
    )
    .await;

    assert_eq!(body["user_id"], "user-1");
    assert_eq!(body["handle"], "ada");
}

#[tokio::test]
async fn every_session_cookie_name_is_accepted() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let client = reqwest::Client::new();

    for name in circlecast::auth::SESSION_COOKIE_NAMES.iter() {
        let token = mint_hs256(name);
        let body = session(
            &addr,
            client
                .get(&format!("{}/auth/session", addr))
                .header("Cookie", format!("{}={}", name, token)),
        )
        .await;

        assert_eq!(body["user_id"], *name, "cookie {}", name);
    }
}

#[tokio::test]
async fn bearer_header_wins_over_cookie() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(mint_hs256("from-header"))
            .header(
                "Cookie",
                format!("authjs.session-token={}", mint_hs256("from-cookie")),
            ),
    )
    .await;

    assert_eq!(body["user_id"], "from-header");
}

#[tokio::test]
async fn larger_hmac_variants_are_accepted() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let key = EncodingKey::from_secret(SECRET.as_bytes());

    for algorithm in [Algorithm::HS384, Algorithm::HS512] {
        let body = session(
            &addr,
            reqwest::Client::new()
                .get(&format!("{}/auth/session", addr))
                .bearer_auth(mint(algorithm, &key, "user-hs", None)),
        )
        .await;

        assert_eq!(body["user_id"], "user-hs", "algorithm {:?}", algorithm);
    }
}

#[tokio::test]
async fn base64_secret_verifies_tokens_signed_with_decoded_bytes() {
    let encoded = "c2Vzc2lvbi1rZXktYnl0ZXMtZm9yLXRlc3Rz";
    let addr = spawn_app(settings_with_secret(Some(encoded)));
    let key = EncodingKey::from_base64_secret(encoded).expect("valid base64 secret");

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(mint(Algorithm::HS256, &key, "user-b64", None)),
    )
    .await;

    assert_eq!(body["user_id"], "user-b64");
}

#[tokio::test]
async fn tampered_signature_is_anonymous() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let token = mint_hs256("user-1");

    let (signing_input, signature) = token.rsplit_once('.').unwrap();
    let first = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", signing_input, first, &signature[1..]);

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(tampered),
    )
    .await;

    assert!(body.is_null());
}

#[tokio::test]
async fn wrong_secret_is_anonymous() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let token = mint(
        Algorithm::HS256,
        &EncodingKey::from_secret(b"some-other-secret"),
        "user-1",
        None,
    );

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(token),
    )
    .await;

    assert!(body.is_null());
}

#[tokio::test]
async fn unsigned_token_is_anonymous() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"user-1"}"#);

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(format!("{}.{}.", header, payload)),
    )
    .await;

    assert!(body.is_null());
}

#[tokio::test]
async fn missing_secret_makes_every_request_anonymous() {
    let addr = spawn_app(settings_with_secret(None));

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(mint_hs256("user-1")),
    )
    .await;

    assert!(body.is_null());
}

#[tokio::test]
async fn protected_route_requires_a_session() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/api/me", addr))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");

    let response = client
        .get(&format!("{}/api/me", addr))
        .bearer_auth(mint_hs256("user-1"))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user_id"], "user-1");
}

#[tokio::test]
async fn concurrent_requests_keep_their_own_identity() {
    let addr = spawn_app(settings_with_secret(Some(SECRET)));
    let client = reqwest::Client::new();

    let first = client
        .get(&format!("{}/auth/session", addr))
        .bearer_auth(mint_hs256("user-a"))
        .send();
    let second = client
        .get(&format!("{}/auth/session", addr))
        .bearer_auth(mint_hs256("user-b"))
        .send();

    let (first, second) = futures::join!(first, second);
    let first: Value = first.unwrap().json().await.unwrap();
    let second: Value = second.unwrap().json().await.unwrap();

    assert_eq!(first["user_id"], "user-a");
    assert_eq!(second["user_id"], "user-b");
}

#[tokio::test]
async fn secret_from_environment_verifies_tokens() {
    let name = "CIRCLECAST_SESSION_ENV_ONLY_SECRET";
    std::env::set_var(name, SECRET);
    let addr = spawn_app(AuthSettings {
        secret_names: vec![name.to_string()],
        ..AuthSettings::default()
    });

    let body = session(
        &addr,
        reqwest::Client::new()
            .get(&format!("{}/auth/session", addr))
            .bearer_auth(mint_hs256("user-env")),
    )
    .await;

    assert_eq!(body["user_id"], "user-env");
}
