use serde::{Deserialize, Serialize};

/// Learning rollup for one user, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_enrollments: u64,
    pub completed_courses: u64,
    /// Minutes.
    pub total_study_time: u64,
    /// Mean percentage over submitted attempts; 0 when there are none.
    pub average_quiz_score: f64,
    pub notes_count: u64,
}

/// Platform-wide counters for administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_students: u64,
    pub total_content: u64,
    pub total_courses: u64,
    pub total_quizzes: u64,
}
