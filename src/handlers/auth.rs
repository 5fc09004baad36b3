// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, PublicUser, RefreshTokenRow, SignupRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{
            ACCESS_COOKIE, Claims, REFRESH_COOKIE, sign_access_token, sign_refresh_token,
            verify_token,
        },
        password_policy::validate_password,
    },
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn unauthorized() -> AppError {
    AppError::AuthError("Identifiants invalides".to_string())
}

fn build_cookie(name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .build()
}

/// Issues both session cookies for a freshly authenticated user.
fn session_cookies(
    jar: CookieJar,
    access_token: String,
    refresh_token: String,
    config: &Config,
) -> CookieJar {
    jar.add(build_cookie(
        ACCESS_COOKIE,
        access_token,
        time::Duration::minutes(config.access_token_ttl_min),
    ))
    .add(build_cookie(
        REFRESH_COOKIE,
        refresh_token,
        time::Duration::days(config.refresh_token_ttl_days),
    ))
}

/// Stores a new refresh token row, valid for the configured number of days.
async fn store_refresh_token<'e, E>(
    executor: E,
    token: &str,
    user_id: i64,
    ttl_days: i64,
) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query("INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(token)
        .bind(user_id)
        .bind(Utc::now() + Duration::days(ttl_days))
        .execute(executor)
        .await?;
    Ok(())
}

/// Registers a new student account.
///
/// The email is normalized (trim + lowercase) before any lookup; the
/// password must clear the full policy, whose violations are reported
/// together. Only the Argon2 hash is ever stored.
pub async fn inscription(
    State(pool): State<PgPool>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = normalize_email(&payload.email);

    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "Un compte existe déjà avec cet email".to_string(),
        ));
    }

    let violations = validate_password(&payload.motdepasse, &payload.nom, &email);
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let hashed_password = hash_password(&payload.motdepasse)?;

    let user = sqlx::query_as::<_, PublicUser>(
        "INSERT INTO users (nom, email, password_hash) VALUES ($1, $2, $3) RETURNING id, nom, email",
    )
    .bind(payload.nom.trim())
    .bind(&email)
    .bind(&hashed_password)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Unique violation can still happen between the check and the insert.
        if e.to_string().contains("unique") || e.to_string().contains("23505") {
            AppError::Conflict("Un compte existe déjà avec cet email".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Compte créé", "user": user })),
    ))
}

/// Authenticates a student and opens a session.
///
/// Unknown email and wrong password produce the exact same 401, so the
/// response never reveals whether the account exists. Both tokens travel as
/// HTTP-only cookies, never in the JSON body.
pub async fn connexion(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = normalize_email(&payload.email);

    let user = sqlx::query_as::<_, User>(
        "SELECT id, nom, email, password_hash, option_filiere, xp, created_at \
         FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(unauthorized)?;

    if !verify_password(&payload.motdepasse, &user.password_hash)? {
        return Err(unauthorized());
    }

    let access_token = sign_access_token(
        user.id,
        &user.email,
        &config.jwt_access_secret,
        config.access_token_ttl_min,
    )?;
    let refresh_token = sign_refresh_token(
        user.id,
        &user.email,
        &config.jwt_refresh_secret,
        config.refresh_token_ttl_days,
    )?;

    store_refresh_token(&pool, &refresh_token, user.id, config.refresh_token_ttl_days).await?;

    let jar = session_cookies(jar, access_token, refresh_token, &config);

    Ok((
        jar,
        Json(json!({
            "message": "Connexion réussie",
            "user": { "id": user.id, "name": user.nom, "email": user.email },
        })),
    ))
}

/// Exchanges a refresh token for a fresh access/refresh pair.
///
/// Single-use rotation: the presented token row is deleted inside the same
/// transaction that stores its replacement, so the old token can never be
/// replayed even if this response is lost. An expired row is deleted as a
/// side effect of the failed attempt.
pub async fn refresh(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let vague = || AppError::AuthError("Non autorisé".to_string());

    let raw_token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(vague)?;

    // Signature and embedded expiry first; a forged cookie never reaches
    // the database.
    verify_token(&raw_token, &config.jwt_refresh_secret).map_err(|_| vague())?;

    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, RefreshTokenRow>(
        "SELECT rt.token, rt.user_id, rt.expires_at, u.nom, u.email \
         FROM refresh_tokens rt JOIN users u ON u.id = rt.user_id \
         WHERE rt.token = $1 FOR UPDATE",
    )
    .bind(&raw_token)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.rollback().await.ok();
        return Err(vague());
    };

    // Consume the presented token unconditionally.
    sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
        .bind(&raw_token)
        .execute(&mut *tx)
        .await?;

    if row.expires_at <= Utc::now() {
        tx.commit().await?;
        return Err(vague());
    }

    let access_token = sign_access_token(
        row.user_id,
        &row.email,
        &config.jwt_access_secret,
        config.access_token_ttl_min,
    )?;
    let new_refresh_token = sign_refresh_token(
        row.user_id,
        &row.email,
        &config.jwt_refresh_secret,
        config.refresh_token_ttl_days,
    )?;

    store_refresh_token(
        &mut *tx,
        &new_refresh_token,
        row.user_id,
        config.refresh_token_ttl_days,
    )
    .await?;

    tx.commit().await?;

    let jar = session_cookies(jar, access_token, new_refresh_token, &config);

    Ok((
        jar,
        Json(json!({
            "message": "Session rafraîchie",
            "user": { "id": row.user_id, "name": row.nom, "email": row.email },
        })),
    ))
}

/// Returns the user bound to the verified access token.
///
/// Identity comes from the claims only; the id is then resolved against the
/// users table so the response carries the current name.
pub async fn session(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, PublicUser>("SELECT id, nom, email FROM users WHERE id = $1")
        .bind(claims.user_id())
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Non autorisé".to_string()))?;

    Ok(Json(json!({ "user": user })))
}

/// Closes the session: best-effort deletion of the stored refresh token,
/// then both cookies are cleared unconditionally.
pub async fn deconnexion(
    State(pool): State<PgPool>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        if let Err(e) = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(cookie.value())
            .execute(&pool)
            .await
        {
            // Logout still succeeds; the row expires on its own.
            tracing::warn!("Failed to delete refresh token on logout: {:?}", e);
        }
    }

    let jar = jar
        .remove(removal_cookie(ACCESS_COOKIE))
        .remove(removal_cookie(REFRESH_COOKIE));

    Ok((jar, Json(json!({ "message": "Déconnexion réussie" }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jean@Ex.COM "), "jean@ex.com");
        assert_eq!(normalize_email("a@b.fr"), "a@b.fr");
    }
}
