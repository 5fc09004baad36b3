// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub nom: String,

    /// Stored normalized: trimmed and lowercased. Unique.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    /// Program track ("option"), e.g. "GL" or "RT". Empty until assigned.
    pub option_filiere: String,

    /// Experience points earned through quizzes.
    pub xp: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// The only user fields ever returned to clients.
#[derive(Debug, Serialize, FromRow)]
pub struct PublicUser {
    pub id: i64,
    #[serde(rename = "name")]
    pub nom: String,
    pub email: String,
}

/// DTO for signup.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Nom requis"))]
    pub nom: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    pub motdepasse: String,
}

/// DTO for login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub motdepasse: String,
}

/// A refresh token row joined to its owning user, fetched during rotation.
#[derive(Debug, FromRow)]
pub struct RefreshTokenRow {
    pub token: String,
    pub user_id: i64,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub nom: String,
    pub email: String,
}
