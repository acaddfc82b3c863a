use std::sync::Arc;

use record_core::model::{Actor, ContentId, CourseId, Percent, Progress, ProgressPatch};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, ProgressRepository, StorageError,
};

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::ProgressServiceError;
use crate::rollup::CourseRollup;

/// Progress tracker: per-content progress writes and course rollup reads.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    ledger: Arc<EnrollmentService>,
    rollup: CourseRollup,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        ledger: Arc<EnrollmentService>,
        rollup: CourseRollup,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
            enrollments,
            ledger,
            rollup,
        }
    }

    /// Apply a partial update to the caller's progress on one content item,
    /// creating the row on first write, then refresh every enrolled course
    /// that contains the content.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::ContentNotFound` for unknown content and
    /// `ProgressServiceError::Storage` if persistence fails.
    pub async fn record_progress(
        &self,
        actor: &Actor,
        content_id: ContentId,
        patch: ProgressPatch,
    ) -> Result<Progress, ProgressServiceError> {
        if self.catalog.get_content(content_id).await?.is_none() {
            tracing::warn!(user = %actor.user_id, content = %content_id, "progress for unknown content");
            return Err(ProgressServiceError::ContentNotFound(content_id));
        }

        let row = self
            .progress
            .apply_progress(&actor.user_id, content_id, &patch, self.clock.now())
            .await
            .map_err(|e| match e {
                StorageError::NotFound => ProgressServiceError::ContentNotFound(content_id),
                other => ProgressServiceError::Storage(other),
            })?;
        tracing::info!(
            user = %actor.user_id,
            content = %content_id,
            progress = row.progress.value(),
            time_spent = row.time_spent,
            completed = row.completed,
            "progress recorded"
        );

        let courses = self
            .enrollments
            .enrolled_courses_containing(&actor.user_id, content_id)
            .await?;
        for course_id in courses {
            self.ledger
                .recompute_course_progress(&actor.user_id, course_id)
                .await?;
        }

        Ok(row)
    }

    /// The caller's progress rows, most recently accessed first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_progress(
        &self,
        actor: &Actor,
        content_id: Option<ContentId>,
    ) -> Result<Vec<Progress>, ProgressServiceError> {
        Ok(self.progress.list_progress(&actor.user_id, content_id).await?)
    }

    /// The caller's completion of a course, computed without writing.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::CourseNotFound` for unknown courses.
    pub async fn get_course_progress(
        &self,
        actor: &Actor,
        course_id: CourseId,
    ) -> Result<Percent, ProgressServiceError> {
        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(ProgressServiceError::CourseNotFound(course_id));
        }
        Ok(self.rollup.compute(&actor.user_id, course_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use record_core::model::{ContentKind, ContentRef, CourseMember, CourseRef, Role, UserId};
    use record_core::time::fixed_now;
    use storage::repository::Storage;

    struct Fixture {
        clock: Clock,
        ledger: Arc<EnrollmentService>,
        service: ProgressService,
    }

    fn learner() -> Actor {
        Actor::new(UserId::new("learner").unwrap(), Role::Student)
    }

    async fn fixture() -> Fixture {
        let clock = Clock::manual(fixed_now());
        let storage = Storage::in_memory();
        let owner = UserId::new("author").unwrap();
        for course in [1, 2] {
            storage
                .catalog
                .register_course(&CourseRef {
                    id: CourseId::new(course),
                    owner: owner.clone(),
                })
                .await
                .unwrap();
        }
        for id in [1, 2, 3] {
            storage
                .catalog
                .register_content(&ContentRef {
                    id: ContentId::new(id),
                    kind: ContentKind::Video,
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

        let rollup = CourseRollup::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        );
        let ledger = Arc::new(EnrollmentService::new(
            clock.clone(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        ));
        let service = ProgressService::new(
            clock.clone(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.enrollments),
            Arc::clone(&ledger),
            rollup,
        );
        Fixture {
            clock,
            ledger,
            service,
        }
    }

    fn pct(v: f64) -> Percent {
        Percent::new(v).unwrap()
    }

    #[tokio::test]
    async fn first_write_creates_row_and_later_writes_patch_it() {
        let f = fixture().await;
        let created = f
            .service
            .record_progress(
                &learner(),
                ContentId::new(1),
                ProgressPatch {
                    progress: Some(pct(30.0)),
                    time_spent: Some(10),
                    completed: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.time_spent, 10);
        assert_eq!(created.last_accessed, fixed_now());

        f.clock.advance(Duration::minutes(7));
        let patched = f
            .service
            .record_progress(&learner(), ContentId::new(1), ProgressPatch::time_spent(5))
            .await
            .unwrap();
        assert_eq!(patched.progress.value(), 30.0);
        assert_eq!(patched.time_spent, 15);
        assert_eq!(patched.last_accessed, f.clock.now());
    }

    #[tokio::test]
    async fn completing_twice_keeps_completed_at() {
        let f = fixture().await;
        let first = f
            .service
            .record_progress(&learner(), ContentId::new(2), ProgressPatch::completed())
            .await
            .unwrap();
        f.clock.advance(Duration::hours(2));
        let second = f
            .service
            .record_progress(&learner(), ContentId::new(2), ProgressPatch::completed())
            .await
            .unwrap();
        assert_eq!(first.completed_at, Some(fixed_now()));
        assert_eq!(second.completed_at, first.completed_at);
    }

    #[tokio::test]
    async fn unknown_content_is_rejected_before_any_write() {
        let f = fixture().await;
        let err = f
            .service
            .record_progress(&learner(), ContentId::new(404), ProgressPatch::completed())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::ContentNotFound(_)));
        assert!(
            f.service
                .get_progress(&learner(), None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn course_progress_is_mean_of_existing_rows_not_of_all_members() {
        let f = fixture().await;
        for (content, value) in [(1, 100.0), (2, 50.0)] {
            f.service
                .record_progress(
                    &learner(),
                    ContentId::new(content),
                    ProgressPatch::progress(pct(value)),
                )
                .await
                .unwrap();
        }
        let value = f
            .service
            .get_course_progress(&learner(), CourseId::new(1))
            .await
            .unwrap()
            .value();
        assert_eq!(value, 75.0);
        assert_ne!(value, 50.0);
    }

    #[tokio::test]
    async fn course_without_members_reports_zero() {
        let f = fixture().await;
        let value = f
            .service
            .get_course_progress(&learner(), CourseId::new(2))
            .await
            .unwrap();
        assert_eq!(value, Percent::ZERO);

        let missing = f
            .service
            .get_course_progress(&learner(), CourseId::new(9))
            .await
            .unwrap_err();
        assert!(matches!(missing, ProgressServiceError::CourseNotFound(_)));
    }

    #[tokio::test]
    async fn progress_write_refreshes_enrolled_course() {
        let f = fixture().await;
        f.ledger.enroll(&learner(), CourseId::new(1)).await.unwrap();
        for content in [1, 2, 3] {
            f.service
                .record_progress(
                    &learner(),
                    ContentId::new(content),
                    ProgressPatch::progress(Percent::FULL),
                )
                .await
                .unwrap();
        }
        let listed = f.ledger.list_enrollments(&learner()).await.unwrap();
        assert_eq!(listed[0].enrollment.progress, Percent::FULL);
        assert_eq!(listed[0].enrollment.completed_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn rows_are_listed_most_recent_first_and_filterable() {
        let f = fixture().await;
        f.service
            .record_progress(&learner(), ContentId::new(1), ProgressPatch::time_spent(1))
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(1));
        f.service
            .record_progress(&learner(), ContentId::new(3), ProgressPatch::time_spent(1))
            .await
            .unwrap();

        let all = f.service.get_progress(&learner(), None).await.unwrap();
        let order: Vec<ContentId> = all.iter().map(|p| p.content_id).collect();
        assert_eq!(order, vec![ContentId::new(3), ContentId::new(1)]);

        let one = f
            .service
            .get_progress(&learner(), Some(ContentId::new(1)))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
    }
}
