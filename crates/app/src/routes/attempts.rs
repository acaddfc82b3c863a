use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use record_core::model::{Answers, AttemptId, QuizAttempt, QuizId};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery, Caller};
use crate::state::AppState;

/// Answers keyed by question order, e.g. `{"answers": {"1": 0, "2": 3}}`.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Answers,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptListQuery {
    pub quiz_id: Option<QuizId>,
}

/// POST /api/quiz-attempts/{attemptId}/submit
async fn submit_attempt(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(attempt_id): AppPath<AttemptId>,
    AppJson(body): AppJson<SubmitRequest>,
) -> AppResult<Json<QuizAttempt>> {
    let attempt = state
        .services
        .quizzes()
        .submit_attempt(&actor, attempt_id, body.answers)
        .await?;
    Ok(Json(attempt))
}

/// GET /api/quiz-attempts?quizId=
async fn list_attempts(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppQuery(query): AppQuery<AttemptListQuery>,
) -> AppResult<Json<Vec<QuizAttempt>>> {
    let attempts = state
        .services
        .quizzes()
        .list_attempts(&actor, query.quiz_id)
        .await?;
    Ok(Json(attempts))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quiz-attempts", get(list_attempts))
        .route("/quiz-attempts/{attempt_id}/submit", post(submit_attempt))
}
