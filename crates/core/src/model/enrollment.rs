use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::catalog::CourseRef;
use crate::model::ids::{CourseId, UserId};
use crate::model::percent::Percent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("completed_at is before enrolled_at")]
    InvalidTimeRange,
}

/// A user's registration in a course with its cached completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: Percent,
}

impl Enrollment {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at,
            completed_at: None,
            progress: Percent::ZERO,
        }
    }

    /// Rehydrate an enrollment from storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidTimeRange` if completion predates enrollment.
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        progress: Percent,
    ) -> Result<Self, EnrollmentError> {
        if completed_at.is_some_and(|at| at < enrolled_at) {
            return Err(EnrollmentError::InvalidTimeRange);
        }
        Ok(Self {
            user_id,
            course_id,
            enrolled_at,
            completed_at,
            progress,
        })
    }

    /// Store a recomputed course completion. Reaching 100 stamps
    /// `completed_at` once; later drops below 100 do not clear it.
    pub fn record_progress(&mut self, progress: Percent, now: DateTime<Utc>) {
        self.progress = progress;
        if progress.is_complete() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// An enrollment joined with the course it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentWithCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn enrollment() -> Enrollment {
        Enrollment::new(UserId::new("u").unwrap(), CourseId::new(1), fixed_now())
    }

    #[test]
    fn new_enrollment_starts_at_zero() {
        let e = enrollment();
        assert_eq!(e.progress, Percent::ZERO);
        assert!(!e.is_completed());
    }

    #[test]
    fn reaching_full_sets_completed_at_once() {
        let mut e = enrollment();
        let done = fixed_now() + Duration::days(1);
        e.record_progress(Percent::FULL, done);
        e.record_progress(Percent::new(80.0).unwrap(), done + Duration::days(1));
        e.record_progress(Percent::FULL, done + Duration::days(2));
        assert_eq!(e.completed_at, Some(done));
        assert_eq!(e.progress, Percent::FULL);
    }

    #[test]
    fn rejects_completion_before_enrollment() {
        let err = Enrollment::from_persisted(
            UserId::new("u").unwrap(),
            CourseId::new(1),
            fixed_now(),
            Some(fixed_now() - Duration::seconds(1)),
            Percent::FULL,
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidTimeRange);
    }
}
