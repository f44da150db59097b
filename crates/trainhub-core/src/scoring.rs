//! Automatic assessment scoring.
//!
//! Multiple choice and true/false questions are graded; essays are left for
//! manual review and count toward neither total. Missing answers earn zero.

use std::collections::HashMap;

use crate::model::{AnswerEntry, AssessmentResult, Question, QuestionType};

/// Points earned by a single answer.
pub fn score_answer(question: &Question, answer: &AnswerEntry) -> u32 {
    let correct = match question.question_type {
        QuestionType::MultipleChoice => answer
            .selected_option_id
            .as_deref()
            .and_then(|key| question.find_option(key))
            .is_some_and(|o| o.is_correct),
        QuestionType::TrueFalse => match (&answer.answer_text, &question.correct_answer) {
            (Some(given), Some(expected)) => given.trim().eq_ignore_ascii_case(expected.trim()),
            _ => false,
        },
        QuestionType::Essay => false,
    };
    if correct {
        question.points
    } else {
        0
    }
}

/// Score a set of answers against the assessment's questions.
///
/// Answers for questions outside `questions` are ignored, and only the last
/// answer per question counts.
pub fn score(questions: &[Question], answers: &[AnswerEntry], pass_mark: u32) -> AssessmentResult {
    let by_question: HashMap<&str, &AnswerEntry> = answers
        .iter()
        .map(|a| (a.question_id.as_str(), a))
        .collect();

    let mut total_points = 0u32;
    let mut earned_points = 0u32;
    for question in questions.iter().filter(|q| q.question_type.is_auto_scored()) {
        total_points += question.points;
        if let Some(answer) = by_question.get(question.id.as_str()) {
            earned_points += score_answer(question, answer);
        }
    }

    let percentage = percentage(earned_points, total_points);
    AssessmentResult {
        percentage,
        is_passed: percentage >= f64::from(pass_mark),
        total_points,
        earned_points,
        certificate_generated: None,
    }
}

/// `earned / total * 100`, 0 when nothing was gradable.
pub fn percentage(earned: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(earned) * 100.0 / f64::from(total)
    }
}
