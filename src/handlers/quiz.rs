// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension,
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::quiz::{Question, Quiz, QuizOutcome, SubmitQuizRequest},
    utils::jwt::Claims,
};

/// Sentinel for a question left unanswered; never matches a valid
/// `correct_index`, so it always grades as wrong.
const UNANSWERED: i64 = -1;

/// Per-question completion time recorded in the audit trail. The client
/// does not report timing yet, so a fixed placeholder is stored.
const COMPLETION_TIME_PLACEHOLDER: i64 = 0;

const XP_PER_CORRECT: i64 = 10;

/// One graded question, ready to be written to the audit trail.
#[derive(Debug, PartialEq, Eq)]
struct GradedAnswer {
    question_id: i64,
    /// Stringified submitted index; "-1" for unanswered.
    submitted: String,
    correct: bool,
}

/// Parses a submitted answer into a choice index.
///
/// Clients send either JSON numbers or numeric strings; anything else is a
/// parse failure and grades as a mismatch.
fn parse_answer_index(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Grades a full submission against the quiz's answer key.
///
/// A question missing from the answer map becomes the unanswered sentinel;
/// it counts wrong but never fails the submission.
fn grade_submission(
    questions: &[Question],
    answers: &HashMap<String, serde_json::Value>,
) -> (Vec<GradedAnswer>, QuizOutcome) {
    let mut graded = Vec::with_capacity(questions.len());
    let mut correct_count = 0i64;

    for question in questions {
        let submitted_index = answers
            .get(&question.key_name)
            .and_then(parse_answer_index)
            .unwrap_or(UNANSWERED);

        let correct = submitted_index == question.correct_index;
        if correct {
            correct_count += 1;
        }

        graded.push(GradedAnswer {
            question_id: question.id,
            submitted: submitted_index.to_string(),
            correct,
        });
    }

    let outcome = QuizOutcome {
        correct_count,
        total: questions.len() as i64,
    };

    (graded, outcome)
}

async fn submit_inner(
    pool: &PgPool,
    user_id: i64,
    quiz_name: &str,
    req: SubmitQuizRequest,
) -> Result<QuizOutcome, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>("SELECT id, name, matiere FROM quizzes WHERE name = $1")
        .bind(quiz_name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz introuvable".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT id, quiz_id, key_name, options, correct_index, explanation \
         FROM questions WHERE quiz_id = $1 ORDER BY id",
    )
    .bind(quiz.id)
    .fetch_all(pool)
    .await?;

    let (graded, outcome) = grade_submission(&questions, &req.answers);

    // All writes for one submission commit together: N audit rows, the
    // summary row and the xp bump. Dropping the transaction on an early
    // `?` return rolls everything back and the connection goes back to
    // the pool either way.
    let mut tx = pool.begin().await?;

    for answer in &graded {
        sqlx::query(
            "INSERT INTO quiz_sessions \
             (user_id, quiz_id, question_id, user_answer, correct, completion_time) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user_id)
        .bind(quiz.id)
        .bind(answer.question_id)
        .bind(&answer.submitted)
        .bind(answer.correct)
        .bind(COMPLETION_TIME_PLACEHOLDER)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO scores (user_id, quiz_id, score) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(quiz.id)
        .bind(outcome.correct_count)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET xp = xp + $1 WHERE id = $2")
        .bind(outcome.correct_count * XP_PER_CORRECT)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(outcome)
}

/// Submits a quiz attempt. The endpoint answers in plain text, including
/// its failure modes.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_name): Path<String>,
    Json(req): Json<SubmitQuizRequest>,
) -> Response {
    match submit_inner(&pool, claims.user_id(), &quiz_name, req).await {
        Ok(outcome) => (StatusCode::OK, outcome.message()).into_response(),
        Err(AppError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg).into_response(),
        Err(e) => {
            tracing::error!("Quiz submission failed: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Erreur serveur".to_string()).into_response()
        }
    }
}
