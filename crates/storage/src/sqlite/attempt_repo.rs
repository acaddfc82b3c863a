use chrono::{DateTime, Utc};
use record_core::model::{AttemptId, AttemptSubmission, QuizAttempt, QuizId, UserId};

use super::SqliteRepository;
use super::mapping::{
    attempt_id_from_i64, bool_to_i64, conn, id_to_i64, map_attempt_row, ser, write_err,
};
use crate::repository::{AttemptRepository, StorageError};

const ATTEMPT_COLUMNS: &str =
    "id, user_id, quiz_id, started_at, answers, score, max_score, percentage, passed, completed_at";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn start_attempt(
        &self,
        user_id: &UserId,
        quiz_id: QuizId,
        at: DateTime<Utc>,
    ) -> Result<QuizAttempt, StorageError> {
        let res = sqlx::query(
            "INSERT INTO quiz_attempts (user_id, quiz_id, started_at) VALUES (?1, ?2, ?3)",
        )
        .bind(user_id.as_str())
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = attempt_id_from_i64(res.last_insert_rowid())?;
        Ok(QuizAttempt::start(id, user_id.clone(), quiz_id, at))
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<Option<QuizAttempt>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = ?1"
        ))
        .bind(id_to_i64("attempt_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_attempt_row).transpose()
    }

    async fn complete_attempt(
        &self,
        id: AttemptId,
        submission: &AttemptSubmission,
    ) -> Result<QuizAttempt, StorageError> {
        let answers = serde_json::to_string(&submission.answers).map_err(ser)?;
        // The completed_at guard makes a second submission a no-op at the row level.
        let row = sqlx::query(&format!(
            r"
            UPDATE quiz_attempts
            SET answers = ?2,
                score = ?3,
                max_score = ?4,
                percentage = ?5,
                passed = ?6,
                completed_at = ?7
            WHERE id = ?1 AND completed_at IS NULL
            RETURNING {ATTEMPT_COLUMNS}
            "
        ))
        .bind(id_to_i64("attempt_id", id.value())?)
        .bind(answers)
        .bind(i64::from(submission.score.score))
        .bind(i64::from(submission.score.max_score))
        .bind(submission.score.percentage.value())
        .bind(bool_to_i64(submission.passed))
        .bind(submission.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)?;

        match row {
            Some(row) => map_attempt_row(&row),
            None => match self.get_attempt(id).await? {
                Some(_) => Err(StorageError::Conflict),
                None => Err(StorageError::NotFound),
            },
        }
    }

    async fn list_attempts(
        &self,
        user_id: &UserId,
        quiz_id: Option<QuizId>,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let quiz = quiz_id
            .map(|id| id_to_i64("quiz_id", id.value()))
            .transpose()?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts
            WHERE user_id = ?1 AND (?2 IS NULL OR quiz_id = ?2)
            ORDER BY started_at DESC, id DESC
            "
        ))
        .bind(user_id.as_str())
        .bind(quiz)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_attempt_row).collect()
    }
}
