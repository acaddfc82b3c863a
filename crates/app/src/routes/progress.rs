use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use record_core::model::{ContentId, Percent, Progress, ProgressPatch};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery, Caller};
use crate::state::AppState;

/// Body of a progress write. Omitted fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordProgressRequest {
    pub content_id: ContentId,
    #[serde(default)]
    pub progress: Option<Percent>,
    /// Minutes to add to the running total.
    #[serde(default)]
    pub time_spent: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    pub content_id: Option<ContentId>,
}

/// POST /api/progress
async fn record_progress(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppJson(body): AppJson<RecordProgressRequest>,
) -> AppResult<Json<Progress>> {
    let patch = ProgressPatch {
        progress: body.progress,
        time_spent: body.time_spent,
        completed: body.completed,
    };
    let row = state
        .services
        .progress()
        .record_progress(&actor, body.content_id, patch)
        .await?;
    Ok(Json(row))
}

/// GET /api/progress?contentId=
async fn get_progress(
    State(state): State<AppState>,
    Caller(actor): Caller,
    AppQuery(query): AppQuery<ProgressQuery>,
) -> AppResult<Json<Vec<Progress>>> {
    let rows = state
        .services
        .progress()
        .get_progress(&actor, query.content_id)
        .await?;
    Ok(Json(rows))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/progress", get(get_progress).post(record_progress))
}
