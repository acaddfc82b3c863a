//! Shared error types for the services crate.

use thiserror::Error;

use record_core::model::{AttemptError, AttemptId, ContentId, CourseId, QuizError, QuizId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Stable classification every service error reduces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Validation,
    Conflict,
    Persistence,
}

impl ErrorKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Persistence => "PERSISTENCE_ERROR",
        }
    }
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    match err {
        StorageError::NotFound => ErrorKind::NotFound,
        StorageError::Conflict => ErrorKind::Conflict,
        _ => ErrorKind::Persistence,
    }
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("not enrolled in course {0}")]
    NotEnrolled(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EnrollmentServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CourseNotFound(_) | Self::NotEnrolled(_) => ErrorKind::NotFound,
            Self::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("content {0} not found")]
    ContentNotFound(ContentId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ContentNotFound(_) | Self::CourseNotFound(_) => ErrorKind::NotFound,
            Self::Enrollment(e) => e.kind(),
            Self::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error("attempt {0} not found")]
    AttemptNotFound(AttemptId),
    #[error("content {0} not found")]
    ContentNotFound(ContentId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("quiz {0} is not published")]
    NotPublished(QuizId),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::QuizNotFound(_)
            | Self::AttemptNotFound(_)
            | Self::ContentNotFound(_)
            | Self::CourseNotFound(_) => ErrorKind::NotFound,
            Self::NotPublished(_)
            | Self::Quiz(QuizError::AlreadyPublished)
            | Self::Attempt(AttemptError::AlreadySubmitted) => ErrorKind::Conflict,
            Self::Quiz(_) | Self::Attempt(_) => ErrorKind::Validation,
            Self::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error("admin role required")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StatsServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Forbidden => ErrorKind::Forbidden,
            Self::Storage(e) => storage_kind(e),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_classify_by_outcome() {
        assert_eq!(
            QuizServiceError::Storage(StorageError::Conflict).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EnrollmentServiceError::Storage(StorageError::Connection("down".into())).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            ProgressServiceError::Enrollment(EnrollmentServiceError::NotEnrolled(CourseId::new(1)))
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn domain_errors_split_between_conflict_and_validation() {
        assert_eq!(
            QuizServiceError::Quiz(QuizError::AlreadyPublished).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            QuizServiceError::Quiz(QuizError::DuplicateOrder(2)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            QuizServiceError::Attempt(AttemptError::AlreadySubmitted).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(ErrorKind::Validation.code(), "VALIDATION_ERROR");
    }
}
