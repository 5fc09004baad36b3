// src/models/quiz.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// Represents the 'quizzes' table. The name is the unique key used in URLs.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub name: String,
    pub matiere: String,
}

/// Represents the 'questions' table.
///
/// Invariant: `correct_index` is a valid index into `options`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Key identifying the question within its quiz; the submitted answer
    /// map is keyed by these.
    pub key_name: String,

    /// Ordered list of choice texts, stored as a JSON array.
    pub options: Json<Vec<String>>,

    pub correct_index: i64,

    pub explanation: Option<String>,
}

/// DTO for submitting a quiz attempt.
///
/// Values may arrive as JSON numbers or numeric strings depending on the
/// client; grading parses both. A question absent from the map counts as
/// unanswered.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: HashMap<String, serde_json::Value>,
}

/// Structured grading outcome; the HTTP layer renders it as plain text.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct QuizOutcome {
    pub correct_count: i64,
    pub total: i64,
}

impl QuizOutcome {
    pub fn message(&self) -> String {
        format!(
            "Bonne(s) réponse(s): {}/{}",
            self.correct_count, self.total
        )
    }
}
