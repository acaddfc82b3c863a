use chrono::{DateTime, Utc};
use record_core::model::{
    QuizId, QuizQuestion, QuizStatus, QuizWithQuestions, Quiz, ValidatedQuestion,
};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_question_row, map_quiz_row, question_id_from_i64, quiz_id_from_i64, ser,
    write_err,
};
use crate::repository::{NewQuizRecord, QuizFilter, QuizRepository, StorageError};

const QUIZ_COLUMNS: &str = "id, title, description, content_id, course_id, status, passing_score, time_limit, created_by, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, quiz_id, question, options, correct_answer, points, question_order";

async fn insert_question_tx(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: QuizId,
    question: ValidatedQuestion,
) -> Result<QuizQuestion, StorageError> {
    let options = serde_json::to_string(&question.options).map_err(ser)?;
    let res = sqlx::query(
        r"
        INSERT INTO quiz_questions (quiz_id, question, options, correct_answer, points, question_order)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ",
    )
    .bind(id_to_i64("quiz_id", quiz_id.value())?)
    .bind(question.question.as_str())
    .bind(options)
    .bind(i64::from(question.correct_answer))
    .bind(i64::from(question.points))
    .bind(i64::from(question.order))
    .execute(&mut **tx)
    .await
    .map_err(write_err)?;

    let id = question_id_from_i64(res.last_insert_rowid())?;
    Ok(question.assign_id(id, quiz_id))
}

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_quiz(&self, record: NewQuizRecord) -> Result<QuizWithQuestions, StorageError> {
        let NewQuizRecord {
            quiz,
            created_by,
            created_at,
        } = record;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
            INSERT INTO quizzes
                (title, description, content_id, course_id, status, passing_score, time_limit, created_by, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            ",
        )
        .bind(quiz.title.as_str())
        .bind(quiz.description.as_deref())
        .bind(
            quiz.content_id
                .map(|id| id_to_i64("content_id", id.value()))
                .transpose()?,
        )
        .bind(
            quiz.course_id
                .map(|id| id_to_i64("course_id", id.value()))
                .transpose()?,
        )
        .bind(QuizStatus::Draft.as_str())
        .bind(quiz.passing_score.value())
        .bind(quiz.time_limit.map(i64::from))
        .bind(created_by.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;
        let id = quiz_id_from_i64(res.last_insert_rowid())?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for question in quiz.questions {
            questions.push(insert_question_tx(&mut tx, id, question).await?);
        }

        tx.commit().await.map_err(conn)?;

        Ok(QuizWithQuestions {
            quiz: Quiz {
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
            },
            questions,
        })
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(&format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?1"))
            .bind(id_to_i64("quiz_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes(&self, filter: QuizFilter) -> Result<Vec<Quiz>, StorageError> {
        let content = filter
            .content_id
            .map(|id| id_to_i64("content_id", id.value()))
            .transpose()?;
        let course = filter
            .course_id
            .map(|id| id_to_i64("course_id", id.value()))
            .transpose()?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {QUIZ_COLUMNS} FROM quizzes
            WHERE (?1 IS NULL OR content_id = ?1)
              AND (?2 IS NULL OR course_id = ?2)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(content)
        .bind(course)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<QuizQuestion>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM quiz_questions WHERE quiz_id = ?1 ORDER BY question_order ASC"
        ))
        .bind(id_to_i64("quiz_id", quiz_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn insert_question(
        &self,
        quiz_id: QuizId,
        question: ValidatedQuestion,
        at: DateTime<Utc>,
    ) -> Result<QuizQuestion, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let touched =
            sqlx::query("UPDATE quizzes SET updated_at = ?2 WHERE id = ?1 AND status = 'draft'")
                .bind(id_to_i64("quiz_id", quiz_id.value())?)
                .bind(at)
                .execute(&mut *tx)
                .await
                .map_err(write_err)?;
        if touched.rows_affected() == 0 {
            drop(tx);
            return match self.get_quiz(quiz_id).await? {
                Some(_) => Err(StorageError::Conflict),
                None => Err(StorageError::NotFound),
            };
        }

        let stored = insert_question_tx(&mut tx, quiz_id, question).await?;
        tx.commit().await.map_err(conn)?;
        Ok(stored)
    }

    async fn publish_quiz(&self, id: QuizId, at: DateTime<Utc>) -> Result<Quiz, StorageError> {
        let quiz_id = id_to_i64("quiz_id", id.value())?;
        let row = sqlx::query(&format!(
            r"
            UPDATE quizzes SET status = 'published', updated_at = ?2
            WHERE id = ?1 AND status = 'draft'
            RETURNING {QUIZ_COLUMNS}
            "
        ))
        .bind(quiz_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)?;

        match row {
            Some(row) => map_quiz_row(&row),
            None => match self.get_quiz(id).await? {
                Some(_) => Err(StorageError::Conflict),
                None => Err(StorageError::NotFound),
            },
        }
    }
}
