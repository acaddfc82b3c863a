use async_trait::async_trait;
use chrono::{DateTime, Utc};
use record_core::model::{
    AdminStats, AttemptId, AttemptSubmission, ContentId, ContentRef, CourseId, CourseMember,
    CourseRef, Enrollment, EnrollmentWithCourse, Progress, ProgressPatch, QuizAttempt,
    QuizId, QuizQuestion, QuizWithQuestions, Quiz, Role, UserId, UserStats, ValidatedQuestion,
    ValidatedQuiz,
};
use std::sync::Arc;
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Result of an enroll call: the one row for the pair, and whether this call created it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollOutcome {
    pub enrollment: Enrollment,
    pub created: bool,
}

/// Insert shape for a quiz and its initial questions.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuizRecord {
    pub quiz: ValidatedQuiz,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// Optional association filters for listing quizzes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizFilter {
    pub content_id: Option<ContentId>,
    pub course_id: Option<CourseId>,
}

impl QuizFilter {
    #[must_use]
    pub fn matches(&self, quiz: &Quiz) -> bool {
        self.content_id.is_none_or(|id| quiz.content_id == Some(id))
            && self.course_id.is_none_or(|id| quiz.course_id == Some(id))
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Reference rows owned by the catalog subsystem.
///
/// Registration calls are upserts: the catalog is the source of truth and may
/// replay its rows.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn register_content(&self, content: &ContentRef) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn register_course(&self, course: &CourseRef) -> Result<(), StorageError>;

    /// Place a content item in a course, replacing its order if already present.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course or content is unknown.
    async fn add_course_content(&self, member: CourseMember) -> Result<(), StorageError>;

    async fn get_content(&self, id: ContentId) -> Result<Option<ContentRef>, StorageError>;

    async fn get_course(&self, id: CourseId) -> Result<Option<CourseRef>, StorageError>;

    /// Member content of a course in course order.
    async fn course_content_ids(&self, course_id: CourseId) -> Result<Vec<ContentId>, StorageError>;
}

/// Users and their notes, owned by the identity and notes subsystems.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn register_user(&self, user_id: &UserId, role: Role) -> Result<(), StorageError>;

    async fn record_note(&self, user_id: &UserId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Insert the enrollment or return the existing row for the pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course is unknown.
    async fn enroll(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<EnrollOutcome, StorageError>;

    async fn get_enrollment(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Enrollments with their course, newest first.
    async fn list_enrollments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EnrollmentWithCourse>, StorageError>;

    /// Courses the user is enrolled in that contain `content_id`.
    async fn enrolled_courses_containing(
        &self,
        user_id: &UserId,
        content_id: ContentId,
    ) -> Result<Vec<CourseId>, StorageError>;

    /// Recompute the cached course completion from the user's progress rows
    /// and store it in the same step, stamping `completed_at` the first time
    /// it reaches 100. The value is the mean over the course members the user
    /// has a row for, or zero when there are none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user is not enrolled.
    async fn refresh_course_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Create or update the row for the pair in one atomic step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the content is unknown.
    async fn apply_progress(
        &self,
        user_id: &UserId,
        content_id: ContentId,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<Progress, StorageError>;

    /// Rows for the user, most recently accessed first.
    async fn list_progress(
        &self,
        user_id: &UserId,
        content_id: Option<ContentId>,
    ) -> Result<Vec<Progress>, StorageError>;

    async fn progress_for_contents(
        &self,
        user_id: &UserId,
        content_ids: &[ContentId],
    ) -> Result<Vec<Progress>, StorageError>;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Insert a quiz and its initial questions together.
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizWithQuestions, StorageError>;

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// Quizzes matching the filter, newest first.
    async fn list_quizzes(&self, filter: QuizFilter) -> Result<Vec<Quiz>, StorageError>;

    /// Questions of a quiz in order.
    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuizQuestion>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the order is already taken or the
    /// quiz is no longer a draft, and `StorageError::NotFound` if the quiz is
    /// unknown.
    async fn insert_question(
        &self,
        quiz_id: QuizId,
        question: ValidatedQuestion,
        at: DateTime<Utc>,
    ) -> Result<QuizQuestion, StorageError>;

    /// Flip a draft quiz to published.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the quiz is no longer a draft and
    /// `StorageError::NotFound` if it does not exist.
    async fn publish_quiz(&self, id: QuizId, at: DateTime<Utc>) -> Result<Quiz, StorageError>;
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn start_attempt(
        &self,
        user_id: &UserId,
        quiz_id: QuizId,
        at: DateTime<Utc>,
    ) -> Result<QuizAttempt, StorageError>;

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError>;

    /// Write a submission onto an in-progress attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt was already submitted
    /// and `StorageError::NotFound` if it does not exist.
    async fn complete_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<QuizAttempt, StorageError>;

    /// Attempts by the user, most recently started first.
    async fn list_attempts(
        &self,
        user_id: &UserId,
        quiz_id: Option<QuizId>,
    ) -> Result<Vec<QuizAttempt>, StorageError>;
}

/// Read-only rollups computed straight from the source rows.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn user_stats(&self, user_id: &UserId) -> Result<UserStats, StorageError>;

    async fn admin_stats(&self) -> Result<AdminStats, StorageError>;
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub directory: Arc<dyn DirectoryRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub stats: Arc<dyn StatsRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Share one backend value across every repository slot.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: CatalogRepository
            + DirectoryRepository
            + EnrollmentRepository
            + ProgressRepository
            + QuizRepository
            + AttemptRepository
            + StatsRepository
            + 'static,
    {
        let repo = Arc::new(repo);
        Self {
            catalog: repo.clone(),
            directory: repo.clone(),
            enrollments: repo.clone(),
            progress: repo.clone(),
            quizzes: repo.clone(),
            attempts: repo.clone(),
            stats: repo,
        }
    }
}
