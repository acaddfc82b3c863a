use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use record_core::model::{AdminStats, UserStats};

use crate::error::AppResult;
use crate::extract::Caller;
use crate::state::AppState;

/// GET /api/stats/user
async fn user_stats(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> AppResult<Json<UserStats>> {
    Ok(Json(state.services.stats().user_stats(&actor).await?))
}

/// GET /api/stats/admin
async fn admin_stats(
    State(state): State<AppState>,
    Caller(actor): Caller,
) -> AppResult<Json<AdminStats>> {
    Ok(Json(state.services.stats().admin_stats(&actor).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats/user", get(user_stats))
        .route("/stats/admin", get(admin_stats))
}
