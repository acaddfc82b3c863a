use chrono::{DateTime, Utc};
use record_core::model::{ContentId, Progress, ProgressPatch, UserId};
use sqlx::{QueryBuilder, Sqlite};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_to_i64, map_progress_row, write_err};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str =
    "user_id, content_id, progress, time_spent, completed, completed_at, last_accessed, created_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn apply_progress(
        &self,
        user_id: &UserId,
        content_id: ContentId,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<Progress, StorageError> {
        // One statement so concurrent writers on the same pair never lose an
        // update or see a duplicate-key failure. time_spent saturates at u32::MAX.
        let row = sqlx::query(&format!(
            r"
            INSERT INTO progress
                (user_id, content_id, progress, time_spent, completed, completed_at, last_accessed, created_at)
            VALUES (
                ?1, ?2,
                COALESCE(?3, 0),
                MIN(COALESCE(?4, 0), 4294967295),
                COALESCE(?5, 0),
                CASE WHEN ?5 = 1 THEN ?6 END,
                ?6, ?6
            )
            ON CONFLICT(user_id, content_id) DO UPDATE SET
                progress = COALESCE(?3, progress),
                time_spent = MIN(time_spent + COALESCE(?4, 0), 4294967295),
                completed = COALESCE(?5, completed),
                completed_at = CASE
                    WHEN completed_at IS NULL AND ?5 = 1 THEN ?6
                    ELSE completed_at
                END,
                last_accessed = ?6
            RETURNING {PROGRESS_COLUMNS}
            "
        ))
        .bind(user_id.as_str())
        .bind(id_to_i64("content_id", content_id.value())?)
        .bind(patch.progress.map(|p| p.value()))
        .bind(patch.time_spent.map(i64::from))
        .bind(patch.completed.map(bool_to_i64))
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)?;

        map_progress_row(&row)
    }

    async fn list_progress(
        &self,
        user_id: &UserId,
        content_id: Option<ContentId>,
    ) -> Result<Vec<Progress>, StorageError> {
        let content = content_id
            .map(|id| id_to_i64("content_id", id.value()))
            .transpose()?;
        let rows = sqlx::query(&format!(
            r"
            SELECT {PROGRESS_COLUMNS} FROM progress
            WHERE user_id = ?1 AND (?2 IS NULL OR content_id = ?2)
            ORDER BY last_accessed DESC, content_id ASC
            "
        ))
        .bind(user_id.as_str())
        .bind(content)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn progress_for_contents(
        &self,
        user_id: &UserId,
        content_ids: &[ContentId],
    ) -> Result<Vec<Progress>, StorageError> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = "));
        builder.push_bind(user_id.as_str());
        builder.push(" AND content_id IN (");
        let mut separated = builder.separated(", ");
        for id in content_ids {
            separated.push_bind(id_to_i64("content_id", id.value())?);
        }
        separated.push_unseparated(") ORDER BY content_id ASC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_progress_row).collect()
    }
}
