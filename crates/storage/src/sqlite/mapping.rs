use chrono::{DateTime, Utc};
use record_core::model::{
    Answers, AttemptId, ContentId, CourseId, CourseRef, Enrollment, Percent, Progress,
    QuestionId, QuizAttempt, QuizId, QuizQuestion, QuizStatus, Quiz, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Map a write failure, turning constraint violations into domain outcomes.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    conn(e)
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    i64_to_u64(field, v)
}

pub(crate) fn content_id_from_i64(v: i64) -> Result<ContentId, StorageError> {
    Ok(ContentId::new(i64_to_u64("content_id", v)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

fn user_id_from_row(row: &SqliteRow, column: &str) -> Result<UserId, StorageError> {
    UserId::new(row.try_get::<String, _>(column).map_err(ser)?).map_err(ser)
}

fn percent_from_row(row: &SqliteRow, column: &str) -> Result<Percent, StorageError> {
    Percent::new(row.try_get::<f64, _>(column).map_err(ser)?).map_err(ser)
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

pub(crate) fn map_course_ref(row: &SqliteRow) -> Result<CourseRef, StorageError> {
    Ok(CourseRef {
        id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        owner: user_id_from_row(row, "course_owner_id")?,
    })
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    Enrollment::from_persisted(
        user_id_from_row(row, "user_id")?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get("enrolled_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        percent_from_row(row, "progress")?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<Progress, StorageError> {
    Progress::from_persisted(
        user_id_from_row(row, "user_id")?,
        content_id_from_i64(row.try_get::<i64, _>("content_id").map_err(ser)?)?,
        percent_from_row(row, "progress")?,
        i64_to_u32("time_spent", row.try_get::<i64, _>("time_spent").map_err(ser)?)?,
        row.try_get::<i64, _>("completed").map_err(ser)? != 0,
        row.try_get("completed_at").map_err(ser)?,
        row.try_get("last_accessed").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_quiz_row(row: &SqliteRow) -> Result<Quiz, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(Quiz {
        id: quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        content_id: row
            .try_get::<Option<i64>, _>("content_id")
            .map_err(ser)?
            .map(content_id_from_i64)
            .transpose()?,
        course_id: row
            .try_get::<Option<i64>, _>("course_id")
            .map_err(ser)?
            .map(course_id_from_i64)
            .transpose()?,
        status: status.parse::<QuizStatus>().map_err(ser)?,
        passing_score: percent_from_row(row, "passing_score")?,
        time_limit: row
            .try_get::<Option<i64>, _>("time_limit")
            .map_err(ser)?
            .map(|v| i64_to_u32("time_limit", v))
            .transpose()?,
        created_by: user_id_from_row(row, "created_by")?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<QuizQuestion, StorageError> {
    let options: String = row.try_get("options").map_err(ser)?;
    Ok(QuizQuestion {
        id: question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        question: row.try_get("question").map_err(ser)?,
        options: serde_json::from_str(&options).map_err(ser)?,
        correct_answer: i64_to_u32(
            "correct_answer",
            row.try_get::<i64, _>("correct_answer").map_err(ser)?,
        )?,
        points: i64_to_u32("points", row.try_get::<i64, _>("points").map_err(ser)?)?,
        order: i64_to_u32(
            "question_order",
            row.try_get::<i64, _>("question_order").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<QuizAttempt, StorageError> {
    let answers = row
        .try_get::<Option<String>, _>("answers")
        .map_err(ser)?
        .map(|raw| serde_json::from_str::<Answers>(&raw))
        .transpose()
        .map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    QuizAttempt::from_persisted(QuizAttempt {
        id: attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id: user_id_from_row(row, "user_id")?,
        quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        started_at: row.try_get("started_at").map_err(ser)?,
        answers,
        score: row
            .try_get::<Option<i64>, _>("score")
            .map_err(ser)?
            .map(|v| i64_to_u32("score", v))
            .transpose()?,
        max_score: row
            .try_get::<Option<i64>, _>("max_score")
            .map_err(ser)?
            .map(|v| i64_to_u32("max_score", v))
            .transpose()?,
        percentage: row
            .try_get::<Option<f64>, _>("percentage")
            .map_err(ser)?
            .map(Percent::new)
            .transpose()
            .map_err(ser)?,
        passed: row
            .try_get::<Option<i64>, _>("passed")
            .map_err(ser)?
            .map(|v| v != 0),
        completed_at,
    })
    .map_err(ser)
}
