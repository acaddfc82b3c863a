use record_core::model::{
    ContentId, ContentKind, ContentRef, CourseId, CourseMember, CourseRef, Role, UserId,
};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{content_id_from_i64, conn, course_id_from_i64, id_to_i64, ser, write_err};
use crate::repository::{CatalogRepository, DirectoryRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn register_content(&self, content: &ContentRef) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO content (id, kind, owner_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                owner_id = excluded.owner_id
            ",
        )
        .bind(id_to_i64("content_id", content.id.value())?)
        .bind(content.kind.as_str())
        .bind(content.owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn register_course(&self, course: &CourseRef) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, owner_id)
            VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id
            ",
        )
        .bind(id_to_i64("course_id", course.id.value())?)
        .bind(course.owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn add_course_content(&self, member: CourseMember) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_content (course_id, content_id, item_order)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(course_id, content_id) DO UPDATE SET item_order = excluded.item_order
            ",
        )
        .bind(id_to_i64("course_id", member.course_id.value())?)
        .bind(id_to_i64("content_id", member.content_id.value())?)
        .bind(i64::from(member.order))
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_content(&self, id: ContentId) -> Result<Option<ContentRef>, StorageError> {
        let row = sqlx::query("SELECT id, kind, owner_id FROM content WHERE id = ?1")
            .bind(id_to_i64("content_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let kind: String = row.try_get("kind").map_err(ser)?;
        Ok(Some(ContentRef {
            id: content_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            kind: kind.parse::<ContentKind>().map_err(ser)?,
            owner: UserId::new(row.try_get::<String, _>("owner_id").map_err(ser)?).map_err(ser)?,
        }))
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<CourseRef>, StorageError> {
        let row = sqlx::query("SELECT id, owner_id FROM courses WHERE id = ?1")
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(CourseRef {
            id: course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            owner: UserId::new(row.try_get::<String, _>("owner_id").map_err(ser)?).map_err(ser)?,
        }))
    }

    async fn course_content_ids(&self, course_id: CourseId) -> Result<Vec<ContentId>, StorageError> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r"
            SELECT content_id FROM course_content
            WHERE course_id = ?1
            ORDER BY item_order ASC, content_id ASC
            ",
        )
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        ids.into_iter().map(content_id_from_i64).collect()
    }
}

#[async_trait::async_trait]
impl DirectoryRepository for SqliteRepository {
    async fn register_user(&self, user_id: &UserId, role: Role) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, role) VALUES (?1, ?2)
            ON CONFLICT(id) DO UPDATE SET role = excluded.role
            ",
        )
        .bind(user_id.as_str())
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn record_note(&self, user_id: &UserId) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO notes (user_id) VALUES (?1)")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}
