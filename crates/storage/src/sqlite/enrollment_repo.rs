use chrono::{DateTime, Utc};
use record_core::model::{ContentId, CourseId, Enrollment, EnrollmentWithCourse, UserId};

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_from_i64, id_to_i64, map_course_ref, map_enrollment_row, write_err,
};
use crate::repository::{EnrollOutcome, EnrollmentRepository, StorageError};

const ENROLLMENT_COLUMNS: &str = "user_id, course_id, enrolled_at, completed_at, progress";

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn enroll(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<EnrollOutcome, StorageError> {
        let course = id_to_i64("course_id", course_id.value())?;
        let res = sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, enrolled_at, progress)
            VALUES (?1, ?2, ?3, 0)
            ON CONFLICT(user_id, course_id) DO NOTHING
            ",
        )
        .bind(user_id.as_str())
        .bind(course)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let enrollment = self
            .get_enrollment(user_id, course_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        Ok(EnrollOutcome {
            enrollment,
            created: res.rows_affected() == 1,
        })
    }

    async fn get_enrollment(
        &self,
        user_id: &UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE user_id = ?1 AND course_id = ?2"
        ))
        .bind(user_id.as_str())
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn list_enrollments(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EnrollmentWithCourse>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT e.user_id, e.course_id, e.enrolled_at, e.completed_at, e.progress,
                   c.owner_id AS course_owner_id
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.user_id = ?1
            ORDER BY e.enrolled_at DESC, e.id DESC
            ",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(EnrollmentWithCourse {
                enrollment: map_enrollment_row(&row)?,
                course: map_course_ref(&row)?,
            });
        }
        Ok(out)
    }

    async fn enrolled_courses_containing(
        &self,
        user_id: &UserId,
        content_id: ContentId,
    ) -> Result<Vec<CourseId>, StorageError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r"
            SELECT DISTINCT e.course_id
            FROM enrollments e
            JOIN course_content cc ON cc.course_id = e.course_id
            WHERE e.user_id = ?1 AND cc.content_id = ?2
            ORDER BY e.course_id ASC
            ",
        )
        .bind(user_id.as_str())
        .bind(id_to_i64("content_id", content_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        ids.into_iter().map(course_id_from_i64).collect()
    }

    async fn refresh_course_progress(
        &self,
        user_id: &UserId,
        course_id: CourseId,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, StorageError> {
        // mean over existing rows only; completed_at is stamped once, at the
        // first write that reaches 100
        let row = sqlx::query(&format!(
            r"
            WITH rollup(value) AS (
                SELECT MIN(100.0, MAX(0.0, COALESCE(AVG(p.progress), 0.0)))
                FROM progress p
                JOIN course_content cc ON cc.content_id = p.content_id
                WHERE cc.course_id = ?2 AND p.user_id = ?1
            )
            UPDATE enrollments
            SET progress = (SELECT value FROM rollup),
                completed_at = CASE
                    WHEN completed_at IS NULL AND (SELECT value FROM rollup) >= 100.0 THEN ?3
                    ELSE completed_at
                END
            WHERE user_id = ?1 AND course_id = ?2
            RETURNING {ENROLLMENT_COLUMNS}
            "
        ))
        .bind(user_id.as_str())
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)?;

        match row {
            Some(row) => map_enrollment_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
