use std::sync::Arc;

use record_core::model::{Actor, CourseId, Enrollment, EnrollmentWithCourse, UserId};
use storage::repository::{CatalogRepository, EnrollOutcome, EnrollmentRepository, StorageError};

use crate::Clock;
use crate::error::EnrollmentServiceError;

/// Enrollment ledger: enrolls users and keeps the cached course completion current.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            enrollments,
        }
    }

    /// Enroll the caller in a course. Enrolling again returns the existing row.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::CourseNotFound` for unknown courses and
    /// `EnrollmentServiceError::Storage` if persistence fails.
    pub async fn enroll(
        &self,
        actor: &Actor,
        course_id: CourseId,
    ) -> Result<EnrollOutcome, EnrollmentServiceError> {
        if self.catalog.get_course(course_id).await?.is_none() {
            tracing::warn!(user = %actor.user_id, course = %course_id, "enroll in unknown course");
            return Err(EnrollmentServiceError::CourseNotFound(course_id));
        }

        let outcome = self
            .enrollments
            .enroll(&actor.user_id, course_id, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EnrollmentServiceError::CourseNotFound(course_id),
                other => EnrollmentServiceError::Storage(other),
            })?;

        if outcome.created {
            tracing::info!(user = %actor.user_id, course = %course_id, "enrolled");
        } else {
            tracing::debug!(user = %actor.user_id, course = %course_id, "already enrolled");
        }
        Ok(outcome)
    }

    /// The caller's enrollments with their course, newest first.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` if repository access fails.
    pub async fn list_enrollments(
        &self,
        actor: &Actor,
    ) -> Result<Vec<EnrollmentWithCourse>, EnrollmentServiceError> {
        Ok(self.enrollments.list_enrollments(&actor.user_id).await?)
    }

    /// Recompute and persist the cached completion of one enrollment. The
    /// read of the progress rows and the write of the enrollment happen in
    /// one storage step.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::NotEnrolled` if the user has no
    /// enrollment for the course.
    pub async fn recompute_course_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        let enrollment = self
            .enrollments
            .refresh_course_progress(user_id, course_id, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EnrollmentServiceError::NotEnrolled(course_id),
                other => EnrollmentServiceError::Storage(other),
            })?;
        tracing::debug!(
            user = %user_id,
            course = %course_id,
            progress = enrollment.progress.value(),
            "course progress recomputed"
        );
        Ok(enrollment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use record_core::model::{
        ContentId, ContentKind, ContentRef, CourseMember, CourseRef, Percent, ProgressPatch, Role,
    };
    use record_core::time::fixed_now;
    use storage::repository::Storage;

    fn learner() -> Actor {
        Actor::new(UserId::new("learner").unwrap(), Role::Student)
    }

    async fn setup(clock: Clock) -> (Storage, EnrollmentService) {
        let storage = Storage::in_memory();
        let owner = UserId::new("author").unwrap();
        storage
            .catalog
            .register_course(&CourseRef {
                id: CourseId::new(1),
                owner: owner.clone(),
            })
            .await
            .unwrap();
        for id in [1, 2, 3] {
            storage
                .catalog
                .register_content(&ContentRef {
                    id: ContentId::new(id),
                    kind: ContentKind::Book,
                    owner: owner.clone(),
                })
                .await
                .unwrap();
            storage
                .catalog
                .add_course_content(CourseMember {
                    course_id: CourseId::new(1),
                    content_id: ContentId::new(id),
                    order: u32::try_from(id).unwrap(),
                })
                .await
                .unwrap();
        }
        let service = EnrollmentService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        );
        (storage, service)
    }

    #[tokio::test]
    async fn enroll_twice_yields_one_row() {
        let clock = Clock::manual(fixed_now());
        let (_storage, service) = setup(clock.clone()).await;

        let first = service.enroll(&learner(), CourseId::new(1)).await.unwrap();
        assert!(first.created);
        assert_eq!(first.enrollment.progress, Percent::ZERO);

        clock.advance(Duration::hours(1));
        let second = service.enroll(&learner(), CourseId::new(1)).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.enrollment.enrolled_at, fixed_now());

        let listed = service.list_enrollments(&learner()).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn enroll_unknown_course_is_not_found() {
        let (_storage, service) = setup(Clock::fixed(fixed_now())).await;
        let err = service
            .enroll(&learner(), CourseId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn recompute_uses_mean_of_existing_rows_and_stamps_completion_once() {
        let clock = Clock::manual(fixed_now());
        let (storage, service) = setup(clock.clone()).await;
        let user = learner().user_id;
        service.enroll(&learner(), CourseId::new(1)).await.unwrap();

        for (content, value) in [(1, 100.0), (2, 50.0)] {
            storage
                .progress
                .apply_progress(
                    &user,
                    ContentId::new(content),
                    &ProgressPatch::progress(Percent::new(value).unwrap()),
                    clock.now(),
                )
                .await
                .unwrap();
        }
        let partial = service
            .recompute_course_progress(&user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(partial.progress.value(), 75.0);
        assert!(partial.completed_at.is_none());

        storage
            .progress
            .apply_progress(
                &user,
                ContentId::new(2),
                &ProgressPatch::progress(Percent::FULL),
                clock.now(),
            )
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        let done_at = clock.now();
        let full = service
            .recompute_course_progress(&user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(full.completed_at, Some(done_at));

        clock.advance(Duration::minutes(5));
        let again = service
            .recompute_course_progress(&user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(again.completed_at, Some(done_at));
    }

    #[tokio::test]
    async fn recompute_without_enrollment_is_not_enrolled() {
        let (_storage, service) = setup(Clock::fixed(fixed_now())).await;
        let err = service
            .recompute_course_progress(&learner().user_id, CourseId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollmentServiceError::NotEnrolled(_)));
    }
}
