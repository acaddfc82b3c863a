use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use record_core::model::{CourseId, Enrollment, EnrollmentWithCourse, Percent};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, Caller};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_id: CourseId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    pub course_id: CourseId,
    pub progress: Percent,
}

/// POST /api/enrollments -- 201 for a new enrollment, 200 for an existing one.
async fn enroll(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppJson(body): AppJson<EnrollRequest>,
) -> AppResult<(StatusCode, Json<Enrollment>)> {
    let outcome = state
        .services
        .enrollments()
        .enroll(&actor, body.course_id)
        .await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.enrollment)))
}

/// GET /api/enrollments
async fn list_enrollments(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> AppResult<Json<Vec<EnrollmentWithCourse>>> {
    let rows = state.services.enrollments().list_enrollments(&actor).await?;
    Ok(Json(rows))
}

/// GET /api/courses/{courseId}/progress
async fn course_progress(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppPath(course_id): AppPath<CourseId>,
) -> AppResult<Json<CourseProgressResponse>> {
    let progress = state
        .services
        .progress()
        .get_course_progress(&actor, course_id)
        .await?;
    Ok(Json(CourseProgressResponse {
        course_id,
        progress,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enrollments", get(list_enrollments).post(enroll))
        .route("/courses/{course_id}/progress", get(course_progress))
}
