use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::ids::{AttemptId, QuizId, UserId};
use crate::model::percent::Percent;
use crate::model::quiz::{Quiz, QuizQuestion};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt was already submitted")]
    AlreadySubmitted,

    #[error("attempt belongs to a different quiz")]
    QuizMismatch,

    #[error("answer given for unknown question order {0}")]
    UnknownQuestion(u32),

    #[error("option {option} does not exist on question {order}")]
    OptionOutOfRange { order: u32, option: u32 },

    #[error("submitted attempt is missing {0}")]
    IncompleteSubmission(&'static str),
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// Selected option index per question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Answers(BTreeMap<u32, u32>);

impl Answers {
    #[must_use]
    pub fn new(by_order: BTreeMap<u32, u32>) -> Self {
        Self(by_order)
    }

    /// Answers listed in question order: the first choice answers question 1.
    #[must_use]
    pub fn from_choices(choices: impl IntoIterator<Item = u32>) -> Self {
        Self((1_u32..).zip(choices).collect())
    }

    #[must_use]
    pub fn choice_for(&self, order: u32) -> Option<u32> {
        self.0.get(&order).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(order, choice)| (*order, *choice))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//
// ─── SCORING ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub score: u32,
    pub max_score: u32,
    pub percentage: Percent,
}

/// Grade `answers` against the stored answer key.
///
/// Every question of the quiz counts toward `max_score`; unanswered
/// questions earn nothing.
///
/// # Errors
///
/// Returns `AttemptError::UnknownQuestion` for answers to orders the quiz does
/// not have and `AttemptError::OptionOutOfRange` for option indexes past the
/// end of a question's options.
pub fn score_answers(questions: &[QuizQuestion], answers: &Answers) -> Result<Score, AttemptError> {
    for (order, choice) in answers.iter() {
        let question = questions
            .iter()
            .find(|q| q.order == order)
            .ok_or(AttemptError::UnknownQuestion(order))?;
        let in_range = usize::try_from(choice)
            .map(|i| i < question.options.len())
            .unwrap_or(false);
        if !in_range {
            return Err(AttemptError::OptionOutOfRange {
                order,
                option: choice,
            });
        }
    }

    let mut score = 0_u32;
    let mut max_score = 0_u32;
    for question in questions {
        max_score = max_score.saturating_add(question.points);
        if answers.choice_for(question.order) == Some(question.correct_answer) {
            score = score.saturating_add(question.points);
        }
    }

    Ok(Score {
        score,
        max_score,
        percentage: Percent::ratio(score, max_score),
    })
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Started,
    Submitted,
}

/// Everything written when an attempt is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSubmission {
    pub answers: Answers,
    pub score: Score,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    pub id: AttemptId,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub started_at: DateTime<Utc>,
    pub answers: Option<Answers>,
    pub score: Option<u32>,
    pub max_score: Option<u32>,
    pub percentage: Option<Percent>,
    pub passed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    /// A freshly started attempt.
    #[must_use]
    pub fn start(id: AttemptId, user_id: UserId, quiz_id: QuizId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            quiz_id,
            started_at: now,
            answers: None,
            score: None,
            max_score: None,
            percentage: None,
            passed: None,
            completed_at: None,
        }
    }

    /// Rehydrate an attempt, checking that a submitted attempt carries its score.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::IncompleteSubmission` if `completed_at` is set but
    /// any scored field is missing.
    pub fn from_persisted(attempt: QuizAttempt) -> Result<Self, AttemptError> {
        if attempt.completed_at.is_some() {
            if attempt.answers.is_none() {
                return Err(AttemptError::IncompleteSubmission("answers"));
            }
            if attempt.score.is_none() || attempt.max_score.is_none() {
                return Err(AttemptError::IncompleteSubmission("score"));
            }
            if attempt.percentage.is_none() {
                return Err(AttemptError::IncompleteSubmission("percentage"));
            }
        }
        Ok(attempt)
    }

    #[must_use]
    pub fn status(&self) -> AttemptStatus {
        if self.completed_at.is_some() {
            AttemptStatus::Submitted
        } else {
            AttemptStatus::Started
        }
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status() == AttemptStatus::Submitted
    }

    /// Score this attempt against the quiz's current question snapshot.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadySubmitted` for finished attempts,
    /// `AttemptError::QuizMismatch` if `quiz` is not this attempt's quiz, and
    /// any error from [`score_answers`].
    pub fn grade(
        &self,
        quiz: &Quiz,
        questions: &[QuizQuestion],
        answers: Answers,
        now: DateTime<Utc>,
    ) -> Result<AttemptSubmission, AttemptError> {
        if self.is_submitted() {
            return Err(AttemptError::AlreadySubmitted);
        }
        if quiz.id != self.quiz_id {
            return Err(AttemptError::QuizMismatch);
        }
        let score = score_answers(questions, &answers)?;
        Ok(AttemptSubmission {
            answers,
            score,
            passed: quiz.is_passing(score.percentage),
            completed_at: now,
        })
    }

    /// Apply a submission produced by [`QuizAttempt::grade`].
    pub fn complete(&mut self, submission: &AttemptSubmission) {
        self.answers = Some(submission.answers.clone());
        self.score = Some(submission.score.score);
        self.max_score = Some(submission.score.max_score);
        self.percentage = Some(submission.score.percentage);
        self.passed = Some(submission.passed);
        self.completed_at = Some(submission.completed_at);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuestionId;
    use crate::model::quiz::QuizStatus;
    use crate::time::fixed_now;

    fn question(order: u32, correct: u32, points: u32) -> QuizQuestion {
        QuizQuestion {
            id: QuestionId::new(u64::from(order)),
            quiz_id: QuizId::new(1),
            question: format!("q{order}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: correct,
            points,
            order,
        }
    }

    fn two_questions() -> Vec<QuizQuestion> {
        vec![question(1, 0, 1), question(2, 1, 2)]
    }

    fn quiz() -> Quiz {
        Quiz {
            id: QuizId::new(1),
            title: "t".into(),
            description: None,
            content_id: None,
            course_id: None,
            status: QuizStatus::Published,
            passing_score: Percent::new(70.0).unwrap(),
            time_limit: None,
            created_by: UserId::new("admin").unwrap(),
            created_at: fixed_now(),
            updated_at: fixed_now(),
        }
    }

    fn attempt() -> QuizAttempt {
        QuizAttempt::start(
            AttemptId::new(1),
            UserId::new("learner").unwrap(),
            QuizId::new(1),
            fixed_now(),
        )
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let score = score_answers(&two_questions(), &Answers::from_choices([0, 1])).unwrap();
        assert_eq!(score.score, 3);
        assert_eq!(score.max_score, 3);
        assert_eq!(score.percentage.value(), 100.0);
    }

    #[test]
    fn partially_correct_scores_by_points() {
        let score = score_answers(&two_questions(), &Answers::from_choices([1, 1])).unwrap();
        assert_eq!(score.score, 2);
        assert_eq!(score.max_score, 3);
        assert!((score.percentage.value() - 66.67).abs() < 0.01);
    }

    #[test]
    fn unanswered_questions_still_count_toward_max() {
        let score = score_answers(&two_questions(), &Answers::from_choices([0])).unwrap();
        assert_eq!(score.score, 1);
        assert_eq!(score.max_score, 3);
    }

    #[test]
    fn quiz_without_questions_scores_zero_percent() {
        let score = score_answers(&[], &Answers::default()).unwrap();
        assert_eq!(score.max_score, 0);
        assert_eq!(score.percentage, Percent::ZERO);
    }

    #[test]
    fn rejects_unknown_question_and_bad_option() {
        let unknown = score_answers(&two_questions(), &Answers::from_choices([0, 1, 0]));
        assert_eq!(unknown.unwrap_err(), AttemptError::UnknownQuestion(3));

        let bad = score_answers(&two_questions(), &Answers::from_choices([7]));
        assert_eq!(
            bad.unwrap_err(),
            AttemptError::OptionOutOfRange {
                order: 1,
                option: 7
            }
        );
    }

    #[test]
    fn grading_sets_passed_against_threshold() {
        let a = attempt();
        let passed = a
            .grade(&quiz(), &two_questions(), Answers::from_choices([0, 1]), fixed_now())
            .unwrap();
        assert!(passed.passed);

        let failed = a
            .grade(&quiz(), &two_questions(), Answers::from_choices([1, 1]), fixed_now())
            .unwrap();
        assert!(!failed.passed);
    }

    #[test]
    fn submitted_attempt_cannot_be_graded_again() {
        let mut a = attempt();
        let submission = a
            .grade(&quiz(), &two_questions(), Answers::from_choices([0, 1]), fixed_now())
            .unwrap();
        a.complete(&submission);
        assert_eq!(a.status(), AttemptStatus::Submitted);
        assert_eq!(a.score, Some(3));

        let again = a.grade(&quiz(), &two_questions(), Answers::from_choices([1, 1]), fixed_now());
        assert_eq!(again.unwrap_err(), AttemptError::AlreadySubmitted);
    }

    #[test]
    fn answers_serialize_keyed_by_order() {
        let json = serde_json::to_string(&Answers::from_choices([2, 0])).unwrap();
        assert_eq!(json, r#"{"1":2,"2":0}"#);
        let back: Answers = serde_json::from_str(&json).unwrap();
        assert_eq!(back.choice_for(1), Some(2));
    }
}
