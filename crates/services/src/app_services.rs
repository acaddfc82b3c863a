use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::rollup::CourseRollup;
use crate::stats_service::StatsService;

/// Assembles the learning-record services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    enrollments: Arc<EnrollmentService>,
    progress: Arc<ProgressService>,
    quizzes: Arc<QuizService>,
    stats: Arc<StatsService>,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: Storage, clock: Clock) -> Self {
        let rollup = CourseRollup::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        );
        let enrollments = Arc::new(EnrollmentService::new(
            clock.clone(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
        ));
        let progress = Arc::new(ProgressService::new(
            clock.clone(),
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.enrollments),
            Arc::clone(&enrollments),
            rollup,
        ));
        let quizzes = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.attempts),
        ));
        let stats = Arc::new(StatsService::new(Arc::clone(&storage.stats)));

        Self {
            storage,
            enrollments,
            progress,
            quizzes,
            stats,
        }
    }

    /// Build services backed by in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(Storage::in_memory(), clock)
    }

    /// Build services backed by `SQLite` storage, migrating the schema first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock))
    }

    /// Raw repositories, for loading catalog reference rows.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats)
    }
}
