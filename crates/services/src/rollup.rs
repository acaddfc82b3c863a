use std::sync::Arc;

use record_core::model::{CourseId, Percent, UserId, course_progress};
use storage::repository::{CatalogRepository, ProgressRepository, StorageError};

/// Computes a user's course completion from per-content progress rows.
#[derive(Clone)]
pub struct CourseRollup {
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl CourseRollup {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, progress: Arc<dyn ProgressRepository>) -> Self {
        Self { catalog, progress }
    }

    /// Mean progress over the course members the user has a row for.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn compute(&self, user_id: &UserId, course_id: CourseId) -> Result<Percent, StorageError> {
        let members = self.catalog.course_content_ids(course_id).await?;
        if members.is_empty() {
            return Ok(Percent::ZERO);
        }
        let rows = self.progress.progress_for_contents(user_id, &members).await?;
        Ok(course_progress(&members, &rows))
    }
}
