// src/utils/jwt.rs

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// Cookie carrying the short-lived access token.
pub const ACCESS_COOKIE: &str = "access_token";

/// Cookie carrying the single-use refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// JWT Claims structure, shared by access and refresh tokens.
///
/// Identity is taken exclusively from the verified claims; no other
/// caller-supplied field is ever trusted.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - stores the User ID (as string).
    pub sub: String,
    /// Email the token was issued for.
    pub email: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    /// Random nonce. `exp` has one-second granularity, so without it two
    /// tokens signed for the same user in the same second would be
    /// byte-identical and collide in the refresh_tokens table.
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> i64 {
        self.sub.parse().unwrap_or(0)
    }
}

fn sign(id: i64, email: &str, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let expiration = (Utc::now() + ttl).timestamp() as usize;

    let jti: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    let claims = Claims {
        sub: id.to_string(),
        email: email.to_owned(),
        exp: expiration,
        jti,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a short-lived access token for the user.
pub fn sign_access_token(
    id: i64,
    email: &str,
    secret: &str,
    ttl_min: i64,
) -> Result<String, AppError> {
    sign(id, email, secret, Duration::minutes(ttl_min))
}

/// Signs a refresh token. The raw value is also persisted server-side so
/// rotation can invalidate it.
pub fn sign_refresh_token(
    id: i64,
    email: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, AppError> {
    sign(id, email, secret, Duration::days(ttl_days))
}

/// Verifies and decodes a JWT string.
///
/// Expired and malformed tokens come back as the same vague `AuthError`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Non autorisé".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: session authentication.
///
/// Reads the access token cookie, verifies it, and injects `Claims` into the
/// request extensions for handlers to use. Missing, invalid and expired
/// cookies all yield the same 401.
pub async fn auth_middleware(
    State(config): State<Config>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::AuthError("Non autorisé".to_string()))?;

    let claims = verify_token(&token, &config.jwt_access_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
