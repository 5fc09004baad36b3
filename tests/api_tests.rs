// tests/api_tests.rs

use campus_backend::{admin_tokens::AdminTokenRegistry, config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL, or None when no test database is configured.
async fn spawn_app() -> Option<String> {
    // These tests need a running Postgres; skip gracefully without one.
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_access_secret: "access_secret_for_tests".to_string(),
        jwt_refresh_secret: "refresh_secret_for_tests".to_string(),
        access_token_ttl_min: 15,
        refresh_token_ttl_days: 7,
        admin_code: "CODE-ADMIN-TEST".to_string(),
        port: 0,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool,
        config,
        admin_tokens: AdminTokenRegistry::new(),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    Some(address)
}

/// Pulls a cookie's value out of the Set-Cookie headers of a response.
fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&prefix))
        .and_then(|v| v.split(';').next())
        .and_then(|v| v.splitn(2, '=').nth(1))
        .map(|v| v.to_string())
}

fn unique_email() -> String {
    format!("jean{}@ex.com", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

#[tokio::test]
async fn test_signup_login_session_logout_flow() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email();

    // Signup
    let response = client
        .post(format!("{}/api/auth/inscription", address))
        .json(&serde_json::json!({
            "nom": "Jean Dupont",
            "email": email,
            "motdepasse": "Wxyz123!"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Jean Dupont");
    assert_eq!(body["user"]["email"], email);

    // Duplicate email is a conflict
    let response = client
        .post(format!("{}/api/auth/inscription", address))
        .json(&serde_json::json!({
            "nom": "Jean Dupont",
            "email": email.to_uppercase(),
            "motdepasse": "Wxyz123!"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Login: tokens arrive as cookies, never in the body
    let response = client
        .post(format!("{}/api/auth/connexion", address))
        .json(&serde_json::json!({ "email": email, "motdepasse": "Wxyz123!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let access = cookie_value(&response, "access_token").expect("access cookie");
    let refresh = cookie_value(&response, "refresh_token").expect("refresh cookie");
    assert!(!access.is_empty());
    assert!(!refresh.is_empty());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Jean Dupont");
    assert!(body.get("accessToken").is_none());
    assert!(body.to_string().find(&access).is_none());

    // Session echoes the same user
    let response = client
        .get(format!("{}/api/auth/session", address))
        .header("Cookie", format!("access_token={}", access))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["name"], "Jean Dupont");
    assert_eq!(body["user"]["email"], email);

    // Logout clears both cookies
    let response = client
        .post(format!("{}/api/auth/deconnexion", address))
        .header(
            "Cookie",
            format!("access_token={}; refresh_token={}", access, refresh),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(cookie_value(&response, "access_token").as_deref(), Some(""));
    assert_eq!(cookie_value(&response, "refresh_token").as_deref(), Some(""));

    // With cleared cookies the session is gone
    let response = client
        .get(format!("{}/api/auth/session", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // The stored refresh token was deleted: replay fails
    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .header("Cookie", format!("refresh_token={}", refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn test_login_failures_share_one_error_shape() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email();

    client
        .post(format!("{}/api/auth/inscription", address))
        .json(&serde_json::json!({
            "nom": "Marie Curie",
            "email": email,
            "motdepasse": "Wxyz123!"
        }))
        .send()
        .await
        .unwrap();

    // Wrong password for an existing account
    let wrong_password = client
        .post(format!("{}/api/auth/connexion", address))
        .json(&serde_json::json!({ "email": email, "motdepasse": "Wxyz124!" }))
        .send()
        .await
        .unwrap();

    // Nonexistent account
    let unknown_email = client
        .post(format!("{}/api/auth/connexion", address))
        .json(&serde_json::json!({ "email": unique_email(), "motdepasse": "Wxyz123!" }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status().as_u16(), 401);
    assert_eq!(unknown_email.status().as_u16(), 401);

    let body_a: serde_json::Value = wrong_password.json().await.unwrap();
    let body_b: serde_json::Value = unknown_email.json().await.unwrap();
    assert_eq!(body_a, body_b, "credential errors must be indistinguishable");
}

#[tokio::test]
async fn test_weak_password_reports_every_rule() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/inscription", address))
        .json(&serde_json::json!({
            "nom": "Jean Dupont",
            "email": unique_email(),
            "motdepasse": "abc"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    let rules = body["errors"].as_array().expect("errors array");
    assert!(rules.len() >= 4, "expected all violations, got {:?}", rules);
}

#[tokio::test]
async fn test_refresh_rotation_is_single_use() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();
    let email = unique_email();

    client
        .post(format!("{}/api/auth/inscription", address))
        .json(&serde_json::json!({
            "nom": "Paul Valery",
            "email": email,
            "motdepasse": "Wxyz123!"
        }))
        .send()
        .await
        .unwrap();

    let login = client
        .post(format!("{}/api/auth/connexion", address))
        .json(&serde_json::json!({ "email": email, "motdepasse": "Wxyz123!" }))
        .send()
        .await
        .unwrap();
    let old_refresh = cookie_value(&login, "refresh_token").unwrap();

    // First exchange succeeds and rotates the token
    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .header("Cookie", format!("refresh_token={}", old_refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let new_refresh = cookie_value(&response, "refresh_token").unwrap();
    assert_ne!(new_refresh, old_refresh);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["email"], email);

    // Replaying the consumed token must fail
    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .header("Cookie", format!("refresh_token={}", old_refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // The rotated token is good for exactly one more exchange
    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .header("Cookie", format!("refresh_token={}", new_refresh))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_refresh_without_cookie_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    // A token signed by someone else never reaches the database
    let response = client
        .post(format!("{}/api/auth/refresh", address))
        .header("Cookie", "refresh_token=not.a.jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn test_contact_form() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/contact", address))
        .json(&serde_json::json!({
            "nom": "Jean Dupont",
            "email": "jean@ex.com",
            "message": "Bonjour, <script>alert(1)</script>question sur le quiz."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let response = client
        .post(format!("{}/api/contact", address))
        .json(&serde_json::json!({
            "nom": "Jean Dupont",
            "email": "pas-un-email",
            "message": "Bonjour"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}
