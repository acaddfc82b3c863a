use async_trait::async_trait;
use chrono::{DateTime, Utc};
use record_core::model::{
    AdminStats, AttemptId, AttemptSubmission, ContentId, ContentRef, CourseId, CourseMember,
    CourseRef, Enrollment, EnrollmentWithCourse, Percent, Progress, ProgressPatch, QuestionId,
    QuizAttempt, QuizId, QuizQuestion, QuizStatus, QuizWithQuestions, Quiz, Role, UserId,
    UserStats, ValidatedQuestion, course_progress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::repository::{
    AttemptRepository, CatalogRepository, DirectoryRepository, EnrollOutcome,
    EnrollmentRepository, NewQuizRecord, ProgressRepository, QuizFilter, QuizRepository,
    StatsRepository, StorageError,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, Role>,
    notes: HashMap<UserId, u64>,
    content: HashMap<ContentId, ContentRef>,
    courses: HashMap<CourseId, CourseRef>,
    members: Vec<CourseMember>,
    // (insertion sequence, row) so equal timestamps still list newest first
    enrollments: HashMap<(UserId, CourseId), (u64, Enrollment)>,
    progress: HashMap<(UserId, ContentId), Progress>,
    quizzes: HashMap<QuizId, Quiz>,
    questions: Vec<QuizQuestion>,
    attempts: HashMap<AttemptId, QuizAttempt>,
    next_seq: u64,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn members_of(&self, course_id: CourseId) -> Vec<ContentId> {
        let mut members: Vec<&CourseMember> = self
            .members
            .iter()
            .filter(|m| m.course_id == course_id)
            .collect();
        members.sort_by_key(|m| (m.order, m.content_id));
        members.into_iter().map(|m| m.content_id).collect()
    }

    fn questions_of(&self, quiz_id: QuizId) -> Vec<QuizQuestion> {
        let mut questions: Vec<QuizQuestion> = self
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        questions
    }
}

/// Process-local backend used by service tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn register_content(&self, content: &ContentRef) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.content.insert(content.id, content.clone());
        Ok(())
    }

    async fn register_course(&self, course: &CourseRef) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.courses.insert(course.id, course.clone());
        Ok(())
    }

    async fn add_course_content(&self, member: CourseMember) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&member.course_id)
            || !guard.content.contains_key(&member.content_id)
        {
            return Err(StorageError::NotFound);
        }
        guard
            .members
            .retain(|m| !(m.course_id == member.course_id && m.content_id == member.content_id));
        guard.members.push(member);
        Ok(())
    }

    async fn get_content(&self, id: ContentId) -> Result<Option<ContentRef>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.content.get(&id).cloned())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<CourseRef>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn course_content_ids(&self, course_id: CourseId) -> Result<Vec<ContentId>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.members_of(course_id))
    }
}

#[async_trait]
impl DirectoryRepository for InMemoryRepository {
    async fn register_user(&self, user_id: &UserId, role: Role) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.users.insert(user_id.clone(), role);
        Ok(())
    }

    async fn record_note(&self, user_id: &UserId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        *guard.notes.entry(user_id.clone()).or_default() += 1;
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn enroll(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<EnrollOutcome, StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&course_id) {
            return Err(StorageError::NotFound);
        }
        let key = (user_id.clone(), course_id);
        if let Some((_, existing)) = guard.enrollments.get(&key) {
            return Ok(EnrollOutcome {
                enrollment: existing.clone(),
                created: false,
            });
        }
        let seq = guard.next_id();
        let enrollment = Enrollment::new(user_id.clone(), course_id, at);
        guard.enrollments.insert(key, (seq, enrollment.clone()));
        Ok(EnrollOutcome {
            enrollment,
            created: true,
        })
    }

    async fn get_enrollment(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .enrollments
            .get(&(user_id.clone(), course_id))
            .map(|(_, e)| e.clone()))
    }

    async fn list_enrollments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EnrollmentWithCourse>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<&(u64, Enrollment)> = guard
            .enrollments
            .values()
            .filter(|(_, e)| &e.user_id == user_id)
            .collect();
        rows.sort_by(|a, b| {
            b.1.enrolled_at
                .cmp(&a.1.enrolled_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        let mut out = Vec::with_capacity(rows.len());
        for (_, enrollment) in rows {
            let course = guard
                .courses
                .get(&enrollment.course_id)
                .cloned()
                .ok_or(StorageError::NotFound)?;
            out.push(EnrollmentWithCourse {
                enrollment: enrollment.clone(),
                course,
            });
        }
        Ok(out)
    }

    async fn enrolled_courses_containing(
        &self,
        user_id: &UserId,
        content_id: ContentId,
    ) -> Result<Vec<CourseId>, StorageError> {
        let guard = self.lock()?;
        let mut courses: Vec<CourseId> = guard
            .members
            .iter()
            .filter(|m| m.content_id == content_id)
            .map(|m| m.course_id)
            .filter(|course_id| guard.enrollments.contains_key(&(user_id.clone(), *course_id)))
            .collect();
        courses.sort();
        courses.dedup();
        Ok(courses)
    }

    async fn refresh_course_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        let mut guard = self.lock()?;
        let members = guard.members_of(course_id);
        let rows: Vec<Progress> = guard
            .progress
            .iter()
            .filter(|((owner, content_id), _)| owner == user_id && members.contains(content_id))
            .map(|(_, row)| row.clone())
            .collect();
        let progress = course_progress(&members, &rows);
        let (_, enrollment) = guard
            .enrollments
            .get_mut(&(user_id.clone(), course_id))
            .ok_or(StorageError::NotFound)?;
        enrollment.record_progress(progress, at);
        Ok(enrollment.clone())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn apply_progress(
        &self,
        user_id: &UserId,
        content_id: ContentId,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        let mut guard = self.lock()?;
        if !guard.content.contains_key(&content_id) {
            return Err(StorageError::NotFound);
        }
        let row = guard
            .progress
            .entry((user_id.clone(), content_id))
            .or_insert_with(|| Progress::start(user_id.clone(), content_id, at));
        row.apply(patch, at);
        Ok(row.clone())
    }

    async fn list_progress(
        &self,
        user_id: &UserId,
        content_id: Option<ContentId>,
    ) -> Result<Vec<Progress>, StorageError> {
        let guard = self.lock()?;
        let mut rows: Vec<Progress> = guard
            .progress
            .values()
            .filter(|p| &p.user_id == user_id)
            .filter(|p| content_id.is_none_or(|id| p.content_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then_with(|| a.content_id.cmp(&b.content_id))
        });
        Ok(rows)
    }

    async fn progress_for_contents(
        &self,
        user_id: &UserId,
        content_ids: &[ContentId],
    ) -> Result<Vec<Progress>, StorageError> {
        let guard = self.lock()?;
        Ok(content_ids
            .iter()
            .filter_map(|id| guard.progress.get(&(user_id.clone(), *id)).cloned())
            .collect())
    }
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizWithQuestions, StorageError> {
        let mut guard = self.lock()?;
        let NewQuizRecord {
            quiz,
            created_by,
            created_at,
        } = record;
        if quiz
            .content_id
            .is_some_and(|id| !guard.content.contains_key(&id))
            || quiz
                .course_id
                .is_some_and(|id| !guard.courses.contains_key(&id))
        {
            return Err(StorageError::NotFound);
        }

        let id = QuizId::new(guard.next_id());
        let stored = Quiz {
            id,
            title: quiz.title,
            description: quiz.description,
            content_id: quiz.content_id,
            course_id: quiz.course_id,
            status: QuizStatus::Draft,
            passing_score: quiz.passing_score,
            time_limit: quiz.time_limit,
            created_by,
            created_at,
            updated_at: created_at,
        };
        let mut questions = Vec::with_capacity(quiz.questions.len());
        for draft in quiz.questions {
            let question = draft.assign_id(QuestionId::new(guard.next_id()), id);
            guard.questions.push(question.clone());
            questions.push(question);
        }
        guard.quizzes.insert(id, stored.clone());
        Ok(QuizWithQuestions {
            quiz: stored,
            questions,
        })
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.quizzes.get(&id).cloned())
    }

    async fn list_quizzes(&self, filter: QuizFilter) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.lock()?;
        let mut quizzes: Vec<Quiz> = guard
            .quizzes
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(quizzes)
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuizQuestion>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.questions_of(quiz_id))
    }

    async fn insert_question(
        &self,
        quiz_id: QuizId,
        question: ValidatedQuestion,
        at: DateTime<Utc>,
    ) -> Result<QuizQuestion, StorageError> {
        let mut guard = self.lock()?;
        let quiz = guard.quizzes.get(&quiz_id).ok_or(StorageError::NotFound)?;
        if quiz.is_published() {
            return Err(StorageError::Conflict);
        }
        if guard
            .questions
            .iter()
            .any(|q| q.quiz_id == quiz_id && q.order == question.order)
        {
            return Err(StorageError::Conflict);
        }
        let stored = question.assign_id(QuestionId::new(guard.next_id()), quiz_id);
        guard.questions.push(stored.clone());
        if let Some(quiz) = guard.quizzes.get_mut(&quiz_id) {
            quiz.updated_at = at;
        }
        Ok(stored)
    }

    async fn publish_quiz(&self, id: QuizId, at: DateTime<Utc>) -> Result<Quiz, StorageError> {
        let mut guard = self.lock()?;
        let quiz = guard.quizzes.get_mut(&id).ok_or(StorageError::NotFound)?;
        if quiz.is_published() {
            return Err(StorageError::Conflict);
        }
        quiz.status = QuizStatus::Published;
        quiz.updated_at = at;
        Ok(quiz.clone())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn start_attempt(
        &self,
        user_id: &UserId,
        quiz_id: QuizId,
        at: DateTime<Utc>,
    ) -> Result<QuizAttempt, StorageError> {
        let mut guard = self.lock()?;
        if !guard.quizzes.contains_key(&quiz_id) {
            return Err(StorageError::NotFound);
        }
        let id = AttemptId::new(guard.next_id());
        let attempt = QuizAttempt::start(id, user_id.clone(), quiz_id, at);
        guard.attempts.insert(id, attempt.clone());
        Ok(attempt)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.attempts.get(&id).cloned())
    }

    async fn complete_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<QuizAttempt, StorageError> {
        let mut guard = self.lock()?;
        let attempt = guard.attempts.get_mut(&id).ok_or(StorageError::NotFound)?;
        if attempt.is_submitted() {
            return Err(StorageError::Conflict);
        }
        attempt.complete(submission);
        Ok(attempt.clone())
    }

    async fn list_attempts(
        &self,
        user_id: &UserId,
        quiz_id: Option<QuizId>,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.lock()?;
        let mut attempts: Vec<QuizAttempt> = guard
            .attempts
            .values()
            .filter(|a| &a.user_id == user_id)
            .filter(|a| quiz_id.is_none_or(|id| a.quiz_id == id))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at).then_with(|| b.id.cmp(&a.id)));
        Ok(attempts)
    }
}

#[async_trait]
impl StatsRepository for InMemoryRepository {
    async fn user_stats(&self, user_id: &UserId) -> Result<UserStats, StorageError> {
        let guard = self.lock()?;
        let enrollments: Vec<&Enrollment> = guard
            .enrollments
            .values()
            .map(|(_, e)| e)
            .filter(|e| &e.user_id == user_id)
            .collect();
        let total_study_time = guard
            .progress
            .values()
            .filter(|p| &p.user_id == user_id)
            .map(|p| u64::from(p.time_spent))
            .sum();
        let average_quiz_score = Percent::mean(
            guard
                .attempts
                .values()
                .filter(|a| &a.user_id == user_id)
                .filter_map(|a| a.percentage),
        )
        .value();

        Ok(UserStats {
            total_enrollments: enrollments.len() as u64,
            completed_courses: enrollments.iter().filter(|e| e.is_completed()).count() as u64,
            total_study_time,
            average_quiz_score,
            notes_count: guard.notes.get(user_id).copied().unwrap_or(0),
        })
    }

    async fn admin_stats(&self) -> Result<AdminStats, StorageError> {
        let guard = self.lock()?;
        Ok(AdminStats {
            total_students: guard
                .users
                .values()
                .filter(|role| **role == Role::Student)
                .count() as u64,
            total_content: guard.content.len() as u64,
            total_courses: guard.courses.len() as u64,
            total_quizzes: guard.quizzes.len() as u64,
        })
    }
}
