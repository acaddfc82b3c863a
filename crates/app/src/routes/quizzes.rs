use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use record_core::model::{
    ContentId, CourseId, QuestionDraft, Quiz, QuizAttempt, QuizDraft, QuizId, QuizQuestion,
    QuizView, QuizWithQuestions,
};
use serde::Deserialize;
use storage::repository::QuizFilter;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery, Caller};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizListQuery {
    pub content_id: Option<ContentId>,
    pub course_id: Option<CourseId>,
}

/// A question plus its optional position; the next free order is used when absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddQuestionRequest {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// POST /api/quizzes
async fn create_quiz(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppJson(draft): AppJson<QuizDraft>,
) -> AppResult<(StatusCode, Json<QuizWithQuestions>)> {
    let created = state.services.quizzes().create_quiz(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/quizzes?contentId=&courseId=
async fn list_quizzes(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppQuery(query): AppQuery<QuizListQuery>,
) -> AppResult<Json<Vec<Quiz>>> {
    let filter = QuizFilter {
        content_id: query.content_id,
        course_id: query.course_id,
    };
    let quizzes = state.services.quizzes().list_quizzes(&actor, filter).await?;
    Ok(Json(quizzes))
}

/// GET /api/quizzes/{quizId}
async fn get_quiz(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(quiz_id): AppPath<QuizId>,
) -> AppResult<Json<QuizView>> {
    let quiz = state.services.quizzes().get_quiz(&actor, quiz_id).await?;
    Ok(Json(quiz))
}

/// POST /api/quizzes/{quizId}/questions
async fn add_question(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(quiz_id): AppPath<QuizId>,
    AppJson(body): AppJson<AddQuestionRequest>,
) -> AppResult<(StatusCode, Json<QuizQuestion>)> {
    let draft = QuestionDraft {
        question: body.question,
        options: body.options,
        correct_answer: body.correct_answer,
        points: body.points,
    };
    let question = state
        .services
        .quizzes()
        .add_question(&actor, quiz_id, draft, body.order)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// POST /api/quizzes/{quizId}/publish
async fn publish_quiz(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(quiz_id): AppPath<QuizId>,
) -> AppResult<Json<Quiz>> {
    let quiz = state.services.quizzes().publish_quiz(&actor, quiz_id).await?;
    Ok(Json(quiz))
}

/// POST /api/quizzes/{quizId}/start
async fn start_attempt(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(quiz_id): AppPath<QuizId>,
) -> AppResult<(StatusCode, Json<QuizAttempt>)> {
    let attempt = state.services.quizzes().start_attempt(&actor, quiz_id).await?;
    Ok((StatusCode::CREATED, Json(attempt)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/quizzes", get(list_quizzes).post(create_quiz))
        .route("/quizzes/{quiz_id}", get(get_quiz))
        .route("/quizzes/{quiz_id}/questions", post(add_question))
        .route("/quizzes/{quiz_id}/publish", post(publish_quiz))
        .route("/quizzes/{quiz_id}/start", post(start_attempt))
}
