use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ContentId, UserId};
use crate::model::percent::Percent;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completed row is missing completed_at")]
    MissingCompletedAt,
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Caller-supplied partial update of a progress row.
///
/// `time_spent` is a number of minutes to add to the stored total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPatch {
    #[serde(default)]
    pub progress: Option<Percent>,
    #[serde(default)]
    pub time_spent: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl ProgressPatch {
    #[must_use]
    pub fn progress(value: Percent) -> Self {
        Self {
            progress: Some(value),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn completed() -> Self {
        Self {
            completed: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn time_spent(minutes: u32) -> Self {
        Self {
            time_spent: Some(minutes),
            ..Self::default()
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// How far one user has gotten through one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub progress: Percent,
    /// Minutes.
    pub time_spent: u32,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Progress {
    /// A fresh row for a pair that has never been written.
    #[must_use]
    pub fn start(user_id: UserId, content_id: ContentId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            content_id,
            progress: Percent::ZERO,
            time_spent: 0,
            completed: false,
            completed_at: None,
            last_accessed: now,
            created_at: now,
        }
    }

    /// Rehydrate a row from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the completion flag and timestamp disagree.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        user_id: UserId,
        content_id: ContentId,
        progress: Percent,
        time_spent: u32,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        last_accessed: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        // A cleared flag keeps its timestamp, but a set flag always has one.
        if completed && completed_at.is_none() {
            return Err(ProgressError::MissingCompletedAt);
        }
        Ok(Self {
            user_id,
            content_id,
            progress,
            time_spent,
            completed,
            completed_at,
            last_accessed,
            created_at,
        })
    }

    /// Apply a patch in place. Fields absent from the patch are untouched.
    ///
    /// `completed_at` is stamped the first time the row becomes completed and
    /// never moves or clears afterwards.
    pub fn apply(&mut self, patch: &ProgressPatch, now: DateTime<Utc>) {
        if let Some(progress) = patch.progress {
            self.progress = progress;
        }
        if let Some(minutes) = patch.time_spent {
            self.time_spent = self.time_spent.saturating_add(minutes);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
            if completed && self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        }
        self.last_accessed = now;
    }
}

/// Course completion for one user: the mean of the progress rows that exist
/// for the course's members. Members without a row are left out, and a course
/// with no members or no rows yields zero.
#[must_use]
pub fn course_progress(members: &[ContentId], rows: &[Progress]) -> Percent {
    Percent::mean(
        rows.iter()
            .filter(|row| members.contains(&row.content_id))
            .map(|row| row.progress),
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn user() -> UserId {
        UserId::new("learner").unwrap()
    }

    fn row(content: u64, value: f64) -> Progress {
        let mut p = Progress::start(user(), ContentId::new(content), fixed_now());
        p.apply(&ProgressPatch::progress(Percent::new(value).unwrap()), fixed_now());
        p
    }

    #[test]
    fn patch_leaves_unspecified_fields_alone() {
        let mut p = Progress::start(user(), ContentId::new(1), fixed_now());
        p.apply(
            &ProgressPatch {
                progress: Some(Percent::new(40.0).unwrap()),
                time_spent: Some(15),
                completed: None,
            },
            fixed_now(),
        );
        let later = fixed_now() + Duration::minutes(3);
        p.apply(&ProgressPatch::time_spent(5), later);

        assert_eq!(p.progress.value(), 40.0);
        assert_eq!(p.time_spent, 20);
        assert!(!p.completed);
        assert_eq!(p.last_accessed, later);
    }

    #[test]
    fn completing_twice_keeps_first_timestamp() {
        let mut p = Progress::start(user(), ContentId::new(1), fixed_now());
        p.apply(&ProgressPatch::completed(), fixed_now());
        let first = p.completed_at;
        p.apply(&ProgressPatch::completed(), fixed_now() + Duration::hours(1));
        assert_eq!(p.completed_at, first);
        assert_eq!(p.completed_at, Some(fixed_now()));
    }

    #[test]
    fn uncompleting_keeps_completed_at() {
        let mut p = Progress::start(user(), ContentId::new(1), fixed_now());
        p.apply(&ProgressPatch::completed(), fixed_now());
        p.apply(
            &ProgressPatch {
                completed: Some(false),
                ..ProgressPatch::default()
            },
            fixed_now() + Duration::minutes(1),
        );
        assert!(!p.completed);
        assert_eq!(p.completed_at, Some(fixed_now()));
    }

    #[test]
    fn persisted_completed_row_requires_timestamp() {
        let err = Progress::from_persisted(
            user(),
            ContentId::new(1),
            Percent::FULL,
            0,
            true,
            None,
            fixed_now(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, ProgressError::MissingCompletedAt);
    }

    #[test]
    fn course_progress_averages_only_existing_rows() {
        let members = [ContentId::new(1), ContentId::new(2), ContentId::new(3)];
        let rows = [row(1, 100.0), row(2, 50.0)];
        let value = course_progress(&members, &rows).value();
        assert_eq!(value, 75.0);
        assert_ne!(value, 50.0);
    }

    #[test]
    fn course_progress_ignores_rows_outside_course() {
        let members = [ContentId::new(1)];
        let rows = [row(1, 20.0), row(9, 100.0)];
        assert_eq!(course_progress(&members, &rows).value(), 20.0);
    }

    #[test]
    fn course_progress_is_zero_without_members() {
        assert_eq!(course_progress(&[], &[row(1, 80.0)]), Percent::ZERO);
    }
}
