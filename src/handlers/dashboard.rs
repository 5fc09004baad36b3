// src/handlers/dashboard.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::score::{LeaderboardEntry, ProgressionEntry, QuizListEntry, StatsResponse},
    utils::jwt::Claims,
};

/// Per-user quiz statistics for the dashboard header.
pub async fn stats(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let (quizzes_taken, best_score, average_score) = sqlx::query_as::<_, (i64, i64, f64)>(
        "SELECT COUNT(*), COALESCE(MAX(score), 0), COALESCE(AVG(score::float8), 0) \
         FROM scores WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(&pool)
    .await?;

    let xp = sqlx::query_scalar::<_, i64>("SELECT xp FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .unwrap_or(0);

    Ok(Json(StatsResponse {
        quizzes_taken,
        best_score,
        average_score,
        xp,
    }))
}

/// Retrieves the top 10 students by cumulative quiz score.
pub async fn classement(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        "SELECT u.nom, COALESCE(SUM(s.score), 0)::BIGINT AS total_score, COUNT(s.id) AS attempts \
         FROM scores s \
         JOIN users u ON s.user_id = u.id \
         GROUP BY u.id, u.nom \
         ORDER BY total_score DESC \
         LIMIT 10",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}

/// The user's own score history, oldest first.
pub async fn progression(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let history = sqlx::query_as::<_, ProgressionEntry>(
        "SELECT q.name AS quiz_name, s.score, s.completed_at \
         FROM scores s \
         JOIN quizzes q ON s.quiz_id = q.id \
         WHERE s.user_id = $1 \
         ORDER BY s.completed_at ASC",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(history))
}

/// Lists the quiz catalogue with question counts.
pub async fn quizzes(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let list = sqlx::query_as::<_, QuizListEntry>(
        "SELECT q.id, q.name, q.matiere, COUNT(qs.id) AS question_count \
         FROM quizzes q \
         LEFT JOIN questions qs ON qs.quiz_id = q.id \
         GROUP BY q.id, q.name, q.matiere \
         ORDER BY q.name",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(list))
}
