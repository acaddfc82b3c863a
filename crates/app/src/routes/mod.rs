//! Route tables, one module per resource.

pub mod attempts;
pub mod enrollments;
pub mod health;
pub mod progress;
pub mod quizzes;
pub mod stats;

use axum::Router;

use crate::state::AppState;

/// Everything mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(enrollments::router())
        .merge(progress::router())
        .merge(quizzes::router())
        .merge(attempts::router())
        .merge(stats::router())
}
