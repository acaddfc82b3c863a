pub mod attempt;
pub mod catalog;
pub mod enrollment;
mod ids;
pub mod percent;
pub mod progress;
pub mod quiz;
mod role;
pub mod stats;

pub use attempt::{
    Answers, AttemptError, AttemptStatus, AttemptSubmission, QuizAttempt, Score, score_answers,
};
pub use catalog::{ContentKind, ContentRef, CourseMember, CourseRef, UnknownContentKind};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentWithCourse};
pub use ids::{AttemptId, ContentId, CourseId, ParseIdError, QuestionId, QuizId, UserId};
pub use percent::{Percent, PercentError};
pub use progress::{Progress, ProgressError, ProgressPatch, course_progress};
pub use quiz::{
    DEFAULT_PASSING_SCORE, DEFAULT_POINTS, QuestionDraft, QuestionView, Quiz, QuizDraft,
    QuizError, QuizQuestion, QuizStatus, QuizView, QuizWithQuestions, ValidatedQuestion,
    ValidatedQuiz,
    check_question_order, next_question_order,
};
pub use role::{Actor, Role, UnknownRole};
pub use stats::{AdminStats, UserStats};
