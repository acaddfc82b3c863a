use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{
    EnrollmentServiceError, ErrorKind, ProgressServiceError, QuizServiceError, StatsServiceError,
};

/// Application-level error type for HTTP handlers.
///
/// Service errors are classified through their [`ErrorKind`]; the rest are
/// transport problems detected before a service is called.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Enrollment(#[from] EnrollmentServiceError),

    #[error(transparent)]
    Progress(#[from] ProgressServiceError),

    #[error(transparent)]
    Quiz(#[from] QuizServiceError),

    #[error(transparent)]
    Stats(#[from] StatsServiceError),

    /// The identity headers are missing or malformed.
    #[error("{0}")]
    Unauthorized(String),

    /// The request body, path or query could not be decoded.
    #[error("{0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Enrollment(e) => Some(e.kind()),
            AppError::Progress(e) => Some(e.kind()),
            AppError::Quiz(e) => Some(e.kind()),
            AppError::Stats(e) => Some(e.kind()),
            AppError::Unauthorized(_) | AppError::BadRequest(_) => None,
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match (&self, self.kind()) {
            (_, Some(ErrorKind::Persistence)) => {
                tracing::error!(error = %self, "persistence error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorKind::Persistence.code(),
                    "An internal error occurred".to_string(),
                )
            }
            (_, Some(kind)) => (status_for(kind), kind.code(), self.to_string()),
            (AppError::Unauthorized(msg), None) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            (_, None) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::Validation.code(),
                self.to_string(),
            ),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
