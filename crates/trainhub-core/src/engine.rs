//! Assessment-taking engine.
//!
//! Walks a learner through an assessment one question at a time:
//!
//! ```text
//! Idle -> LoadingQuestions -> InProgress(index) -> Submitting -> Results
//! ```
//!
//! Failures never become a resting state. A failed start falls back to
//! `Idle`; a failed submit falls back to `InProgress` with every answer kept,
//! so the learner can retry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ApiError, ValidationError};
use crate::model::{Answer, AnswerEntry, AssessmentResult, AssessmentSubmission, Question, QuestionType};
use crate::traits::TrainingApi;

/// Where the engine is in the attempt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingQuestions,
    InProgress(usize),
    Submitting,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::LoadingQuestions => write!(f, "loading-questions"),
            Phase::InProgress(i) => write!(f, "in-progress({i})"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Results => write!(f, "results"),
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt state
// ---------------------------------------------------------------------------

/// Questions, cursor and recorded answers of one attempt.
///
/// Pure state: no I/O happens here.
#[derive(Debug, Clone)]
pub struct Attempt {
    assessment_id: String,
    questions: Vec<Question>,
    index: usize,
    answers: HashMap<String, Answer>,
}

impl Attempt {
    /// The question order given here is fixed for the whole attempt.
    pub fn new(assessment_id: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            assessment_id: assessment_id.into(),
            questions,
            index: 0,
            answers: HashMap::new(),
        }
    }

    pub fn assessment_id(&self) -> &str {
        &self.assessment_id
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.questions.len()
    }

    /// Advance one question; stays put on the last one.
    pub fn next(&mut self) -> usize {
        if self.index + 1 < self.questions.len() {
            self.index += 1;
        }
        self.index
    }

    /// Go back one question; stays put on the first one.
    pub fn previous(&mut self) -> usize {
        self.index = self.index.saturating_sub(1);
        self.index
    }

    /// Jump to `index`, clamped to the valid range.
    pub fn go_to(&mut self, index: usize) -> usize {
        self.index = index.min(self.questions.len().saturating_sub(1));
        self.index
    }

    /// Record (or overwrite) the answer for `question_id`.
    ///
    /// The answer shape must fit the question type. The cursor never moves.
    pub fn record(&mut self, question_id: &str, answer: Answer) -> Result<(), ValidationError> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ValidationError::UnknownQuestion(question_id.to_string()))?;

        let mismatch = |reason: &str| ValidationError::AnswerMismatch {
            question_id: question_id.to_string(),
            reason: reason.to_string(),
        };

        let answer = match (question.question_type, answer) {
            (QuestionType::MultipleChoice, Answer::SelectedOption(key)) => {
                if question.find_option(&key).is_none() {
                    return Err(mismatch("option does not belong to this question"));
                }
                Answer::SelectedOption(key)
            }
            (QuestionType::MultipleChoice, Answer::Text(_)) => {
                return Err(mismatch("multiple choice questions take an option"));
            }
            (QuestionType::TrueFalse, Answer::Text(text)) => {
                let normalized = text.trim().to_lowercase();
                if normalized != "true" && normalized != "false" {
                    return Err(mismatch("answer must be \"true\" or \"false\""));
                }
                Answer::Text(normalized)
            }
            (QuestionType::Essay, Answer::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(mismatch("essay answer is empty"));
                }
                Answer::Text(text)
            }
            (_, Answer::SelectedOption(_)) => {
                return Err(mismatch("only multiple choice questions take an option"));
            }
        };

        self.answers.insert(question_id.to_string(), answer);
        Ok(())
    }

    pub fn answer(&self, question_id: &str) -> Option<&Answer> {
        self.answers.get(question_id)
    }

    /// Forget the answer for `question_id`, turning it back into a skip.
    pub fn clear_answer(&mut self, question_id: &str) -> Option<Answer> {
        self.answers.remove(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Build the submission payload.
    ///
    /// One entry per answered question, in attempt order. Unanswered
    /// questions are left out entirely.
    pub fn submission(&self) -> AssessmentSubmission {
        let answers = self
            .questions
            .iter()
            .filter_map(|q| self.answers.get(&q.id).map(|a| AnswerEntry::new(q.id.clone(), a)))
            .collect();
        AssessmentSubmission {
            assessment_id: self.assessment_id.clone(),
            answers,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives an `Attempt` against a backend.
pub struct AssessmentTaker {
    api: Arc<dyn TrainingApi>,
    phase: Phase,
    attempt: Option<Attempt>,
    result: Option<AssessmentResult>,
    last_error: Option<String>,
}

impl AssessmentTaker {
    pub fn new(api: Arc<dyn TrainingApi>) -> Self {
        Self {
            api,
            phase: Phase::Idle,
            attempt: None,
            result: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    /// Banner text of the last failure, if not yet dismissed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::InProgress(_) => self.attempt.as_ref().and_then(Attempt::current),
            _ => None,
        }
    }

    /// Fetch the questions and begin a fresh attempt.
    pub async fn start(&mut self, assessment_id: &str) -> Result<(), ApiError> {
        self.phase = Phase::LoadingQuestions;
        self.attempt = None;
        self.result = None;
        self.last_error = None;
        tracing::debug!(assessment_id, "loading assessment questions");

        let loaded = match self.api.assessment_questions(assessment_id).await {
            Ok(questions) if questions.is_empty() => Err(ValidationError::EmptyAssessment.into()),
            other => other,
        };

        match loaded {
            Ok(questions) => {
                tracing::debug!(assessment_id, count = questions.len(), "attempt started");
                self.attempt = Some(Attempt::new(assessment_id, questions));
                self.phase = Phase::InProgress(0);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(assessment_id, "failed to start attempt: {e}");
                self.phase = Phase::Idle;
                self.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    fn active_attempt(&mut self) -> Option<&mut Attempt> {
        match self.phase {
            Phase::InProgress(_) => self.attempt.as_mut(),
            _ => None,
        }
    }

    /// Move to the next question. Returns the new index, or `None` when no
    /// attempt is in progress.
    pub fn next(&mut self) -> Option<usize> {
        let index = self.active_attempt()?.next();
        self.phase = Phase::InProgress(index);
        Some(index)
    }

    pub fn previous(&mut self) -> Option<usize> {
        let index = self.active_attempt()?.previous();
        self.phase = Phase::InProgress(index);
        Some(index)
    }

    pub fn go_to(&mut self, index: usize) -> Option<usize> {
        let index = self.active_attempt()?.go_to(index);
        self.phase = Phase::InProgress(index);
        Some(index)
    }

    /// Record an answer without moving the cursor.
    pub fn record_answer(&mut self, question_id: &str, answer: Answer) -> Result<(), ApiError> {
        let attempt = self.active_attempt().ok_or(ValidationError::NoActiveAttempt)?;
        attempt.record(question_id, answer)?;
        Ok(())
    }

    /// Submit every recorded answer once.
    pub async fn submit(&mut self) -> Result<&AssessmentResult, ApiError> {
        let (submission, index) = match (self.phase, self.attempt.as_ref()) {
            (Phase::InProgress(index), Some(attempt)) => (attempt.submission(), index),
            _ => return Err(ValidationError::NoActiveAttempt.into()),
        };

        self.phase = Phase::Submitting;
        tracing::debug!(
            assessment_id = %submission.assessment_id,
            answers = submission.answers.len(),
            "submitting attempt"
        );

        let outcome = self
            .api
            .submit_assessment(&submission.assessment_id, &submission)
            .await;

        match outcome {
            Ok(result) => {
                tracing::info!(
                    assessment_id = %submission.assessment_id,
                    percentage = result.percentage,
                    passed = result.is_passed,
                    "attempt scored"
                );
                self.phase = Phase::Results;
                self.last_error = None;
                let result = self.result.insert(result);
                Ok(&*result)
            }
            Err(e) => {
                tracing::warn!(assessment_id = %submission.assessment_id, "submission failed: {e}");
                self.phase = Phase::InProgress(index);
                self.last_error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Leave the results screen.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.attempt = None;
        self.result = None;
        self.last_error = None;
    }
}
