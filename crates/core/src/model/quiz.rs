use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ContentId, CourseId, QuestionId, QuizId, UserId};
use crate::model::percent::Percent;

/// Passing threshold used when the author does not pick one.
pub const DEFAULT_PASSING_SCORE: Percent = Percent::new_unchecked(70.0);

/// Points awarded for a question when the author does not pick a value.
pub const DEFAULT_POINTS: u32 = 1;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("time limit must be > 0 minutes")]
    InvalidTimeLimit,

    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("a question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option {0} is blank")]
    BlankOption(usize),

    #[error("correct answer {index} is out of range for {options} options")]
    CorrectAnswerOutOfRange { index: u32, options: usize },

    #[error("question points must be >= 1")]
    InvalidPoints,

    #[error("question order {got} is not the next position (expected {expected})")]
    OrderNotDense { expected: u32, got: u32 },

    #[error("question order {0} is already taken")]
    DuplicateOrder(u32),

    #[error("quiz is already published")]
    AlreadyPublished,

    #[error("a quiz without questions cannot be published")]
    NoQuestions,

    #[error("unknown quiz status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// `draft → published`, one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Published,
}

impl QuizStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Published => "published",
        }
    }
}

impl FromStr for QuizStatus {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(QuizStatus::Draft),
            "published" => Ok(QuizStatus::Published),
            other => Err(QuizError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

/// Author input for one question, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    #[serde(default)]
    pub points: Option<u32>,
}

impl QuestionDraft {
    /// Validate the draft and pin it to a position in the quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for blank text, fewer than two options, a blank
    /// option, an out-of-range answer key, or zero points.
    pub fn validate(self, order: u32) -> Result<ValidatedQuestion, QuizError> {
        let question = self.question.trim().to_owned();
        if question.is_empty() {
            return Err(QuizError::EmptyQuestion);
        }
        if self.options.len() < 2 {
            return Err(QuizError::TooFewOptions(self.options.len()));
        }
        if let Some(blank) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuizError::BlankOption(blank));
        }
        let in_range = usize::try_from(self.correct_answer)
            .map(|i| i < self.options.len())
            .unwrap_or(false);
        if !in_range {
            return Err(QuizError::CorrectAnswerOutOfRange {
                index: self.correct_answer,
                options: self.options.len(),
            });
        }
        let points = self.points.unwrap_or(DEFAULT_POINTS);
        if points == 0 {
            return Err(QuizError::InvalidPoints);
        }
        if order == 0 {
            return Err(QuizError::OrderNotDense {
                expected: 1,
                got: order,
            });
        }

        Ok(ValidatedQuestion {
            question,
            options: self.options,
            correct_answer: self.correct_answer,
            points,
            order,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    pub points: u32,
    pub order: u32,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId, quiz_id: QuizId) -> QuizQuestion {
        QuizQuestion {
            id,
            quiz_id,
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer,
            points: self.points,
            order: self.order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: u32,
    pub points: u32,
    pub order: u32,
}

/// The order a new question must take given the questions already present.
#[must_use]
pub fn next_question_order(existing: &[QuizQuestion]) -> u32 {
    existing.iter().map(|q| q.order).max().unwrap_or(0) + 1
}

/// Check that `order` is the next dense position after `existing`.
///
/// # Errors
///
/// Returns `QuizError::DuplicateOrder` if the position is taken, or
/// `QuizError::OrderNotDense` if it would leave a gap.
pub fn check_question_order(existing: &[QuizQuestion], order: u32) -> Result<(), QuizError> {
    if existing.iter().any(|q| q.order == order) {
        return Err(QuizError::DuplicateOrder(order));
    }
    let expected = next_question_order(existing);
    if order != expected {
        return Err(QuizError::OrderNotDense {
            expected,
            got: order,
        });
    }
    Ok(())
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Author input for a new quiz, optionally with its first questions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_id: Option<ContentId>,
    #[serde(default)]
    pub course_id: Option<CourseId>,
    /// Minutes.
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub passing_score: Option<Percent>,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

impl QuizDraft {
    /// Validate the quiz and its initial questions, numbering them from 1.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found in the quiz fields or any question.
    pub fn validate(self) -> Result<ValidatedQuiz, QuizError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if self.time_limit == Some(0) {
            return Err(QuizError::InvalidTimeLimit);
        }
        let description = self
            .description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        let mut questions = Vec::with_capacity(self.questions.len());
        for (order, draft) in (1_u32..).zip(self.questions) {
            questions.push(draft.validate(order)?);
        }

        Ok(ValidatedQuiz {
            title,
            description,
            content_id: self.content_id,
            course_id: self.course_id,
            time_limit: self.time_limit,
            passing_score: self.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
            questions,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuiz {
    pub title: String,
    pub description: Option<String>,
    pub content_id: Option<ContentId>,
    pub course_id: Option<CourseId>,
    pub time_limit: Option<u32>,
    pub passing_score: Percent,
    pub questions: Vec<ValidatedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub description: Option<String>,
    pub content_id: Option<ContentId>,
    pub course_id: Option<CourseId>,
    pub status: QuizStatus,
    pub passing_score: Percent,
    pub time_limit: Option<u32>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quiz {
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.status == QuizStatus::Published
    }

    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.created_by == user
    }

    /// Questions may only be added while the quiz is a draft.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyPublished` for published quizzes.
    pub fn ensure_editable(&self) -> Result<(), QuizError> {
        if self.is_published() {
            return Err(QuizError::AlreadyPublished);
        }
        Ok(())
    }

    /// Move the quiz to `published`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::AlreadyPublished` when already published, and
    /// `QuizError::NoQuestions` when there is nothing to answer.
    pub fn publish(&mut self, question_count: usize, now: DateTime<Utc>) -> Result<(), QuizError> {
        self.ensure_editable()?;
        if question_count == 0 {
            return Err(QuizError::NoQuestions);
        }
        self.status = QuizStatus::Published;
        self.updated_at = now;
        Ok(())
    }

    #[must_use]
    pub fn is_passing(&self, percentage: Percent) -> bool {
        percentage >= self.passing_score
    }
}

/// A quiz with its questions in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuizQuestion>,
}

impl QuizWithQuestions {
    /// What `viewer` may see of the quiz: only its author gets the answer key.
    #[must_use]
    pub fn view_for(self, viewer: &UserId) -> QuizView {
        let reveal = self.quiz.is_owned_by(viewer);
        QuizView {
            questions: self
                .questions
                .into_iter()
                .map(|q| QuestionView::from_question(q, reveal))
                .collect(),
            quiz: self.quiz,
        }
    }
}

/// A question as shown to a reader. `correct_answer` is absent unless the
/// reader may see the answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub question: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<u32>,
    pub points: u32,
    pub order: u32,
}

impl QuestionView {
    fn from_question(q: QuizQuestion, reveal: bool) -> Self {
        Self {
            id: q.id,
            quiz_id: q.quiz_id,
            question: q.question,
            options: q.options,
            correct_answer: reveal.then_some(q.correct_answer),
            points: q.points,
            order: q.order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionView>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn question(correct: u32) -> QuestionDraft {
        QuestionDraft {
            question: "2 + 2?".into(),
            options: vec!["4".into(), "5".into()],
            correct_answer: correct,
            points: None,
        }
    }

    fn quiz() -> Quiz {
        Quiz {
            id: QuizId::new(1),
            title: "Arithmetic".into(),
            description: None,
            content_id: None,
            course_id: None,
            status: QuizStatus::Draft,
            passing_score: Percent::new(70.0).unwrap(),
            time_limit: None,
            created_by: UserId::new("admin").unwrap(),
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    #[test]
    fn draft_defaults_passing_score_and_numbers_questions() {
        let validated = QuizDraft {
            title: "  Basics ".into(),
            questions: vec![question(0), question(1)],
            ..QuizDraft::default()
        }
        .validate()
        .unwrap();

        assert_eq!(validated.title, "Basics");
        assert_eq!(validated.passing_score.value(), 70.0);
        let orders: Vec<u32> = validated.questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(validated.questions[0].points, DEFAULT_POINTS);
    }

    #[test]
    fn draft_rejects_blank_title_and_zero_time_limit() {
        let blank = QuizDraft {
            title: "  ".into(),
            ..QuizDraft::default()
        };
        assert_eq!(blank.validate().unwrap_err(), QuizError::EmptyTitle);

        let zero = QuizDraft {
            title: "t".into(),
            time_limit: Some(0),
            ..QuizDraft::default()
        };
        assert_eq!(zero.validate().unwrap_err(), QuizError::InvalidTimeLimit);
    }

    #[test]
    fn question_rejects_out_of_range_answer_and_zero_points() {
        assert_eq!(
            question(2).validate(1).unwrap_err(),
            QuizError::CorrectAnswerOutOfRange {
                index: 2,
                options: 2
            }
        );
        let mut zero = question(0);
        zero.points = Some(0);
        assert_eq!(zero.validate(1).unwrap_err(), QuizError::InvalidPoints);

        let mut lonely = question(0);
        lonely.options.truncate(1);
        assert_eq!(lonely.validate(1).unwrap_err(), QuizError::TooFewOptions(1));
    }

    #[test]
    fn order_must_be_next_dense_slot() {
        let existing = vec![
            question(0)
                .validate(1)
                .unwrap()
                .assign_id(QuestionId::new(10), QuizId::new(1)),
        ];
        assert_eq!(
            check_question_order(&existing, 1).unwrap_err(),
            QuizError::DuplicateOrder(1)
        );
        assert_eq!(
            check_question_order(&existing, 3).unwrap_err(),
            QuizError::OrderNotDense {
                expected: 2,
                got: 3
            }
        );
        assert!(check_question_order(&existing, 2).is_ok());
        assert!(check_question_order(&[], 1).is_ok());
    }

    #[test]
    fn publish_is_one_way_and_needs_questions() {
        let mut q = quiz();
        assert_eq!(q.publish(0, fixed_now()).unwrap_err(), QuizError::NoQuestions);
        q.publish(2, fixed_now()).unwrap();
        assert!(q.is_published());
        assert_eq!(q.ensure_editable().unwrap_err(), QuizError::AlreadyPublished);
        assert_eq!(q.publish(2, fixed_now()).unwrap_err(), QuizError::AlreadyPublished);
    }

    #[test]
    fn answer_key_is_shown_to_the_author_only() {
        let full = QuizWithQuestions {
            quiz: quiz(),
            questions: vec![QuizQuestion {
                id: QuestionId::new(1),
                quiz_id: QuizId::new(1),
                question: "2 + 2?".into(),
                options: vec!["4".into(), "5".into()],
                correct_answer: 0,
                points: 1,
                order: 1,
            }],
        };

        let author = full.clone().view_for(&UserId::new("admin").unwrap());
        assert_eq!(author.questions[0].correct_answer, Some(0));

        let reader = full.view_for(&UserId::new("learner").unwrap());
        assert_eq!(reader.questions[0].correct_answer, None);
        let json = serde_json::to_value(&reader).unwrap();
        assert!(json["questions"][0].get("correctAnswer").is_none());
        assert_eq!(json["questions"][0]["options"][1], "5");
        assert_eq!(json["title"], "Arithmetic");
    }

    #[test]
    fn passing_is_inclusive_of_threshold() {
        let q = quiz();
        assert!(q.is_passing(Percent::new(70.0).unwrap()));
        assert!(!q.is_passing(Percent::new(69.9).unwrap()));
    }
}
