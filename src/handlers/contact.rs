// src/handlers/contact.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{error::AppError, utils::html::clean_html};

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "Nom requis"))]
    pub nom: String,
    #[validate(email(message = "Email invalide"))]
    pub email: String,
    #[validate(length(min = 1, max = 2000, message = "Message requis (2000 caractères max)"))]
    pub message: String,
}

/// Stores a contact-form message. Open endpoint; the message body is
/// sanitized before storage since the admin panel renders it back.
pub async fn contact(
    State(pool): State<PgPool>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let message = clean_html(payload.message.trim());

    sqlx::query("INSERT INTO messages (nom, email, message) VALUES ($1, $2, $3)")
        .bind(payload.nom.trim())
        .bind(payload.email.trim())
        .bind(&message)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to store contact message: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(json!({ "success": true })))
}
