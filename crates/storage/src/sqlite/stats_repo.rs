use record_core::model::{AdminStats, UserId, UserStats};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, count_from_i64, ser};
use crate::repository::{StatsRepository, StorageError};

#[async_trait::async_trait]
impl StatsRepository for SqliteRepository {
    async fn user_stats(&self, user_id: &UserId) -> Result<UserStats, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM enrollments WHERE user_id = ?1) AS total_enrollments,
                (SELECT COUNT(*) FROM enrollments
                    WHERE user_id = ?1 AND completed_at IS NOT NULL) AS completed_courses,
                (SELECT COALESCE(SUM(time_spent), 0) FROM progress
                    WHERE user_id = ?1) AS total_study_time,
                (SELECT CAST(COALESCE(AVG(percentage), 0) AS REAL) FROM quiz_attempts
                    WHERE user_id = ?1 AND completed_at IS NOT NULL) AS average_quiz_score,
                (SELECT COUNT(*) FROM notes WHERE user_id = ?1) AS notes_count
            ",
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        Ok(UserStats {
            total_enrollments: count_from_i64(
                "total_enrollments",
                row.try_get("total_enrollments").map_err(ser)?,
            )?,
            completed_courses: count_from_i64(
                "completed_courses",
                row.try_get("completed_courses").map_err(ser)?,
            )?,
            total_study_time: count_from_i64(
                "total_study_time",
                row.try_get("total_study_time").map_err(ser)?,
            )?,
            average_quiz_score: row.try_get("average_quiz_score").map_err(ser)?,
            notes_count: count_from_i64("notes_count", row.try_get("notes_count").map_err(ser)?)?,
        })
    }

    async fn admin_stats(&self) -> Result<AdminStats, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'student') AS total_students,
                (SELECT COUNT(*) FROM content) AS total_content,
                (SELECT COUNT(*) FROM courses) AS total_courses,
                (SELECT COUNT(*) FROM quizzes) AS total_quizzes
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        Ok(AdminStats {
            total_students: count_from_i64(
                "total_students",
                row.try_get("total_students").map_err(ser)?,
            )?,
            total_content: count_from_i64("total_content", row.try_get("total_content").map_err(ser)?)?,
            total_courses: count_from_i64("total_courses", row.try_get("total_courses").map_err(ser)?)?,
            total_quizzes: count_from_i64("total_quizzes", row.try_get("total_quizzes").map_err(ser)?)?,
        })
    }
}
