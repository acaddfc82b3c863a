use std::sync::Arc;

use record_core::model::{
    Actor, Answers, AttemptError, AttemptId, QuestionDraft, Quiz, QuizAttempt, QuizDraft, QuizId,
    QuizQuestion, QuizView, QuizWithQuestions, check_question_order, next_question_order,
};
use storage::repository::{
    AttemptRepository, CatalogRepository, NewQuizRecord, QuizFilter, QuizRepository,
    StorageError,
};

use crate::Clock;
use crate::error::QuizServiceError;

/// Quiz engine: authoring, publishing, attempts and server-side scoring.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            quizzes,
            attempts,
        }
    }

    async fn load_quiz(&self, quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(QuizServiceError::QuizNotFound(quiz_id))
    }

    async fn load_owned_quiz(&self, actor: &Actor, quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !quiz.is_owned_by(&actor.user_id) {
            tracing::warn!(user = %actor.user_id, quiz = %quiz_id, "quiz authoring by non-owner");
            return Err(QuizServiceError::Forbidden("only the quiz owner may change it"));
        }
        Ok(quiz)
    }

    // ─── Authoring ─────────────────────────────────────────────────────────────

    /// Create a draft quiz, optionally with its first questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for non-admin callers,
    /// `QuizServiceError::Quiz` for invalid input, and
    /// `QuizServiceError::ContentNotFound`/`CourseNotFound` for dangling
    /// associations. Nothing is written on error.
    pub async fn create_quiz(
        &self,
        actor: &Actor,
        draft: QuizDraft,
    ) -> Result<QuizWithQuestions, QuizServiceError> {
        if !actor.is_admin() {
            tracing::warn!(user = %actor.user_id, "quiz creation by non-admin");
            return Err(QuizServiceError::Forbidden("admin role required to create quizzes"));
        }
        let quiz = draft.validate()?;
        if let Some(content_id) = quiz.content_id {
            if self.catalog.get_content(content_id).await?.is_none() {
                return Err(QuizServiceError::ContentNotFound(content_id));
            }
        }
        if let Some(course_id) = quiz.course_id {
            if self.catalog.get_course(course_id).await?.is_none() {
                return Err(QuizServiceError::CourseNotFound(course_id));
            }
        }

        let created = self
            .quizzes
            .insert_quiz(NewQuizRecord {
                quiz,
                created_by: actor.user_id.clone(),
                created_at: self.clock.now(),
            })
            .await?;
        tracing::info!(
            user = %actor.user_id,
            quiz = %created.quiz.id,
            questions = created.questions.len(),
            "quiz created"
        );
        Ok(created)
    }

    /// Append a question to a draft quiz. Without an explicit `order` the
    /// question takes the next free position.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for non-owners,
    /// `QuizServiceError::Quiz` for invalid questions, gaps or duplicate
    /// orders, and a conflict once the quiz is published.
    pub async fn add_question(
        &self,
        actor: &Actor,
        quiz_id: QuizId,
        draft: QuestionDraft,
        order: Option<u32>,
    ) -> Result<QuizQuestion, QuizServiceError> {
        let quiz = self.load_owned_quiz(actor, quiz_id).await?;
        quiz.ensure_editable()?;

        let existing = self.quizzes.list_questions(quiz_id).await?;
        let order = order.unwrap_or_else(|| next_question_order(&existing));
        check_question_order(&existing, order)?;
        let question = draft.validate(order)?;

        let stored = self
            .quizzes
            .insert_question(quiz_id, question, self.clock.now())
            .await?;
        tracing::info!(quiz = %quiz_id, order = stored.order, "question added");
        Ok(stored)
    }

    /// Move a draft quiz to `published`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for non-owners, a validation
    /// error for a quiz without questions, and a conflict if already published.
    pub async fn publish_quiz(&self, actor: &Actor, quiz_id: QuizId) -> Result<Quiz, QuizServiceError> {
        let mut quiz = self.load_owned_quiz(actor, quiz_id).await?;
        let questions = self.quizzes.list_questions(quiz_id).await?;
        let now = self.clock.now();
        quiz.publish(questions.len(), now)?;

        let published = self.quizzes.publish_quiz(quiz_id, now).await?;
        tracing::info!(quiz = %quiz_id, "quiz published");
        Ok(published)
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    /// A quiz with its ordered questions. Drafts are visible to their owner
    /// only, and so is the answer key.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::QuizNotFound` if the quiz is missing or not
    /// visible to the caller.
    pub async fn get_quiz(&self, actor: &Actor, quiz_id: QuizId) -> Result<QuizView, QuizServiceError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !quiz.is_published() && !quiz.is_owned_by(&actor.user_id) {
            return Err(QuizServiceError::QuizNotFound(quiz_id));
        }
        let questions = self.quizzes.list_questions(quiz_id).await?;
        Ok(QuizWithQuestions { quiz, questions }.view_for(&actor.user_id))
    }

    /// Quizzes newest first, filtered by association. Other authors' drafts are hidden.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_quizzes(
        &self,
        actor: &Actor,
        filter: QuizFilter,
    ) -> Result<Vec<Quiz>, QuizServiceError> {
        let mut quizzes = self.quizzes.list_quizzes(filter).await?;
        quizzes.retain(|q| q.is_published() || q.is_owned_by(&actor.user_id));
        Ok(quizzes)
    }

    // ─── Attempts ──────────────────────────────────────────────────────────────

    /// Start a new attempt at a published quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::QuizNotFound` for unknown quizzes and
    /// `QuizServiceError::NotPublished` for drafts.
    pub async fn start_attempt(
        &self,
        actor: &Actor,
        quiz_id: QuizId,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !quiz.is_published() {
            return Err(QuizServiceError::NotPublished(quiz_id));
        }
        let attempt = self
            .attempts
            .start_attempt(&actor.user_id, quiz_id, self.clock.now())
            .await?;
        tracing::info!(user = %actor.user_id, quiz = %quiz_id, attempt = %attempt.id, "attempt started");
        Ok(attempt)
    }

    /// Score the caller's answers against the stored key and close the attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::AttemptNotFound` for unknown attempts,
    /// `QuizServiceError::Forbidden` for someone else's attempt,
    /// `QuizServiceError::Attempt` for a double submission or answers that
    /// do not fit the quiz.
    pub async fn submit_attempt(
        &self,
        actor: &Actor,
        attempt_id: AttemptId,
        answers: Answers,
    ) -> Result<QuizAttempt, QuizServiceError> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or(QuizServiceError::AttemptNotFound(attempt_id))?;
        if attempt.user_id != actor.user_id {
            tracing::warn!(user = %actor.user_id, attempt = %attempt_id, "submit by non-owner");
            return Err(QuizServiceError::Forbidden("attempt belongs to another user"));
        }
        if attempt.is_submitted() {
            return Err(AttemptError::AlreadySubmitted.into());
        }

        let quiz = self.load_quiz(attempt.quiz_id).await?;
        let questions = self.quizzes.list_questions(quiz.id).await?;
        let submission = attempt.grade(&quiz, &questions, answers, self.clock.now())?;

        let completed = self
            .attempts
            .complete_attempt(attempt_id, &submission)
            .await
            .map_err(|e| match e {
                StorageError::Conflict => QuizServiceError::Attempt(AttemptError::AlreadySubmitted),
                other => QuizServiceError::Storage(other),
            })?;
        tracing::info!(
            user = %actor.user_id,
            attempt = %attempt_id,
            score = submission.score.score,
            max_score = submission.score.max_score,
            passed = submission.passed,
            "attempt submitted"
        );
        Ok(completed)
    }

    /// The caller's attempts, most recently started first.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_attempts(
        &self,
        actor: &Actor,
        quiz_id: Option<QuizId>,
    ) -> Result<Vec<QuizAttempt>, QuizServiceError> {
        Ok(self.attempts.list_attempts(&actor.user_id, quiz_id).await?)
    }
}
