//! Loads catalog reference rows from a JSON document.

use std::path::Path;

use record_core::model::{ContentId, ContentRef, CourseId, CourseMember, CourseRef, Role, UserId};
use serde::Deserialize;
use storage::repository::{Storage, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Catalog document shape.
///
/// ```json
/// {
///   "users": [{ "id": "ada", "role": "admin" }],
///   "content": [{ "id": 1, "type": "video", "owner": "ada" }],
///   "courses": [{ "id": 1, "owner": "ada", "content": [1] }],
///   "notes": [{ "userId": "ada", "count": 2 }]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub users: Vec<SeedUser>,
    pub content: Vec<ContentRef>,
    pub courses: Vec<SeedCourse>,
    pub notes: Vec<SeedNotes>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub role: Role,
}

/// A course and its member content, listed in display order.
#[derive(Debug, Deserialize)]
pub struct SeedCourse {
    pub id: CourseId,
    pub owner: UserId,
    #[serde(default)]
    pub content: Vec<ContentId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedNotes {
    pub user_id: UserId,
    pub count: u32,
}

/// Row counts written by one seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub content: usize,
    pub courses: usize,
    pub memberships: usize,
    pub notes: usize,
}

impl CatalogSeed {
    /// # Errors
    ///
    /// Returns `SeedError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Upsert every row. Users and content go first so courses can reference them.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Storage` on the first failed write; a course member
    /// naming unknown content is `StorageError::NotFound`.
    pub async fn apply(&self, storage: &Storage) -> Result<SeedSummary, SeedError> {
        let mut summary = SeedSummary::default();

        for user in &self.users {
            storage.directory.register_user(&user.id, user.role).await?;
            summary.users += 1;
        }
        for content in &self.content {
            storage.catalog.register_content(content).await?;
            summary.content += 1;
        }
        for course in &self.courses {
            storage
                .catalog
                .register_course(&CourseRef {
                    id: course.id,
                    owner: course.owner.clone(),
                })
                .await?;
            summary.courses += 1;
            for (order, content_id) in (1_u32..).zip(&course.content) {
                storage
                    .catalog
                    .add_course_content(CourseMember {
                        course_id: course.id,
                        content_id: *content_id,
                        order,
                    })
                    .await?;
                summary.memberships += 1;
            }
        }
        for notes in &self.notes {
            for _ in 0..notes.count {
                storage.directory.record_note(&notes.user_id).await?;
                summary.notes += 1;
            }
        }

        tracing::info!(
            users = summary.users,
            content = summary.content,
            courses = summary.courses,
            memberships = summary.memberships,
            notes = summary.notes,
            "catalog seeded"
        );
        Ok(summary)
    }
}
