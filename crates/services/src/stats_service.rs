use std::sync::Arc;

use record_core::model::{Actor, AdminStats, UserStats};
use storage::repository::StatsRepository;

use crate::error::StatsServiceError;

/// Aggregation service: read-only rollups over the learning record.
#[derive(Clone)]
pub struct StatsService {
    stats: Arc<dyn StatsRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(stats: Arc<dyn StatsRepository>) -> Self {
        Self { stats }
    }

    /// The caller's own learning summary.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Storage` if repository access fails.
    pub async fn user_stats(&self, actor: &Actor) -> Result<UserStats, StatsServiceError> {
        let stats = self.stats.user_stats(&actor.user_id).await?;
        tracing::debug!(user = %actor.user_id, enrollments = stats.total_enrollments, "user stats");
        Ok(stats)
    }

    /// Platform-wide counters.
    ///
    /// # Errors
    ///
    /// Returns `StatsServiceError::Forbidden` unless the caller is an admin.
    pub async fn admin_stats(&self, actor: &Actor) -> Result<AdminStats, StatsServiceError> {
        if !actor.is_admin() {
            tracing::warn!(user = %actor.user_id, "admin stats requested by non-admin");
            return Err(StatsServiceError::Forbidden);
        }
        Ok(self.stats.admin_stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_core::model::{Role, UserId};
    use storage::repository::Storage;

    fn actor(id: &str, role: Role) -> Actor {
        Actor::new(UserId::new(id).unwrap(), role)
    }

    #[tokio::test]
    async fn empty_dataset_reports_zeros() {
        let storage = Storage::in_memory();
        let service = StatsService::new(Arc::clone(&storage.stats));

        let user = service.user_stats(&actor("u1", Role::Student)).await.unwrap();
        assert_eq!(user, UserStats::default());
        assert_eq!(user.average_quiz_score, 0.0);

        let admin = service.admin_stats(&actor("root", Role::Admin)).await.unwrap();
        assert_eq!(admin, AdminStats::default());
    }

    #[tokio::test]
    async fn students_cannot_read_admin_stats() {
        let storage = Storage::in_memory();
        let service = StatsService::new(Arc::clone(&storage.stats));
        let err = service
            .admin_stats(&actor("u1", Role::Student))
            .await
            .unwrap_err();
        assert!(matches!(err, StatsServiceError::Forbidden));
    }

    #[tokio::test]
    async fn notes_and_students_are_counted() {
        let storage = Storage::in_memory();
        let alice = UserId::new("alice").unwrap();
        storage.directory.register_user(&alice, Role::Student).await.unwrap();
        storage
            .directory
            .register_user(&UserId::new("root").unwrap(), Role::Admin)
            .await
            .unwrap();
        storage.directory.record_note(&alice).await.unwrap();
        storage.directory.record_note(&alice).await.unwrap();

        let service = StatsService::new(Arc::clone(&storage.stats));
        let user = service.user_stats(&actor("alice", Role::Student)).await.unwrap();
        assert_eq!(user.notes_count, 2);

        let admin = service.admin_stats(&actor("root", Role::Admin)).await.unwrap();
        assert_eq!(admin.total_students, 1);
    }
}
