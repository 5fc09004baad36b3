// src/models/score.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'scores' table: one row per submission attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated row for the leaderboard, joined from `users` and `scores`.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub nom: String,
    pub total_score: i64,
    pub attempts: i64,
}

/// One point of a user's score history.
#[derive(Debug, Serialize, FromRow)]
pub struct ProgressionEntry {
    pub quiz_name: String,
    pub score: i64,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-user dashboard statistics.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub quizzes_taken: i64,
    pub best_score: i64,
    pub average_score: f64,
    pub xp: i64,
}

/// Catalogue entry for the quiz list.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizListEntry {
    pub id: i64,
    pub name: String,
    pub matiere: String,
    pub question_count: i64,
}
