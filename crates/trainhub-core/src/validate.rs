//! Client-side form validation.
//!
//! Forms are checked and normalized before anything is sent; a failure here
//! never reaches the network.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::model::{NewAssessment, NewModule, NewProgram, NewQuestion, NewUnit, Question, QuestionType};

/// Drop blank learning objectives and trim the rest.
pub fn strip_objectives(objectives: Vec<String>) -> Vec<String> {
    objectives
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

fn in_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        })
    } else {
        Ok(())
    }
}

impl NewProgram {
    /// Validate and normalize the form.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        require(&self.title, "title")?;
        in_range("expiry_duration", i64::from(self.expiry_duration), 1, 1200)?;
        self.title = self.title.trim().to_string();
        self.learning_objectives = strip_objectives(self.learning_objectives);
        self.renewal_requirements = self
            .renewal_requirements
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Ok(self)
    }
}

impl NewModule {
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        require(&self.program_id, "program_id")?;
        require(&self.title, "title")?;
        self.title = self.title.trim().to_string();
        Ok(self)
    }
}

impl NewUnit {
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        require(&self.module_id, "module_id")?;
        require(&self.title, "title")?;
        self.title = self.title.trim().to_string();
        self.learning_objectives = strip_objectives(self.learning_objectives);
        Ok(self)
    }
}

impl NewQuestion {
    /// Enforce the per-type invariants.
    ///
    /// - multiple choice: non-empty options, at least one correct
    /// - true/false: `correct_answer` of `"true"` or `"false"`, no options
    /// - essay: neither options nor a correct answer
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        require(&self.text, "question text")?;
        if self.points == 0 {
            return Err(ValidationError::OutOfRange {
                field: "points",
                min: 1,
                max: i64::from(u32::MAX),
                value: 0,
            });
        }
        self.correct_answer = self
            .correct_answer
            .map(|a| a.trim().to_lowercase())
            .filter(|a| !a.is_empty());

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.correct_answer.is_some() {
                    return Err(ValidationError::UnexpectedCorrectAnswer("multiple choice"));
                }
                for (i, option) in self.options.iter_mut().enumerate() {
                    option.text = option.text.trim().to_string();
                    if option.text.is_empty() {
                        return Err(ValidationError::EmptyOption(i + 1));
                    }
                }
                if !self.options.iter().any(|o| o.is_correct) {
                    return Err(ValidationError::NoCorrectOption);
                }
            }
            QuestionType::TrueFalse => {
                if !self.options.is_empty() {
                    return Err(ValidationError::UnexpectedOptions("true/false"));
                }
                match self.correct_answer.as_deref() {
                    Some("true") | Some("false") => {}
                    _ => return Err(ValidationError::InvalidTrueFalseAnswer),
                }
            }
            QuestionType::Essay => {
                if !self.options.is_empty() {
                    return Err(ValidationError::UnexpectedOptions("essay"));
                }
                if self.correct_answer.is_some() {
                    return Err(ValidationError::UnexpectedCorrectAnswer("essay"));
                }
            }
        }

        self.text = self.text.trim().to_string();
        self.explanation = self
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        Ok(self)
    }
}

impl NewAssessment {
    /// Validate the form, checking question ids against `bank` when given.
    pub fn validated(mut self, bank: Option<&[Question]>) -> Result<Self, ValidationError> {
        require(&self.title, "title")?;
        if self.question_ids.is_empty() {
            return Err(ValidationError::MissingField("question_ids"));
        }
        in_range("pass_mark", i64::from(self.pass_mark), 1, 100)?;
        in_range("max_attempts", i64::from(self.max_attempts), 1, i64::from(u32::MAX))?;
        if let Some(limit) = self.time_limit {
            in_range("time_limit", i64::from(limit), 1, i64::from(u32::MAX))?;
        }

        let mut seen = HashSet::new();
        for id in &self.question_ids {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::DuplicateQuestion(id.clone()));
            }
        }

        if let Some(bank) = bank {
            let known: HashSet<&str> = bank.iter().map(|q| q.id.as_str()).collect();
            if let Some(missing) = self.question_ids.iter().find(|id| !known.contains(id.as_str())) {
                return Err(ValidationError::UnknownQuestion(missing.clone()));
            }
        }

        self.title = self.title.trim().to_string();
        for scope in [&mut self.program_id, &mut self.module_id, &mut self.unit_id] {
            if scope.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *scope = None;
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;

    fn mc(options: Vec<QuestionOption>) -> NewQuestion {
        NewQuestion {
            text: "Which class covers flammable liquids?".into(),
            question_type: QuestionType::MultipleChoice,
            options,
            correct_answer: None,
            points: 2,
            explanation: None,
        }
    }

    fn bank_question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: "q".into(),
            question_type: QuestionType::Essay,
            options: vec![],
            correct_answer: None,
            points: 1,
            explanation: None,
        }
    }

    fn assessment(ids: &[&str]) -> NewAssessment {
        NewAssessment {
            title: "Final".into(),
            description: String::new(),
            program_id: Some("p1".into()),
            module_id: Some("  ".into()),
            unit_id: None,
            question_ids: ids.iter().map(|s| s.to_string()).collect(),
            pass_mark: 80,
            max_attempts: 3,
            time_limit: None,
            randomize_questions: false,
        }
    }

    #[test]
    fn objectives_are_stripped() {
        let program = NewProgram {
            title: "  Hazmat  ".into(),
            description: "d".into(),
            learning_objectives: vec!["".into(), " Identify classes ".into(), "   ".into()],
            expiry_duration: 24,
            renewal_requirements: Some(" ".into()),
        }
        .validated()
        .unwrap();
        assert_eq!(program.title, "Hazmat");
        assert_eq!(program.learning_objectives, vec!["Identify classes"]);
        assert!(program.renewal_requirements.is_none());
    }

    #[test]
    fn program_needs_positive_expiry() {
        let err = NewProgram {
            title: "Hazmat".into(),
            description: String::new(),
            learning_objectives: vec![String::new()],
            expiry_duration: 0,
            renewal_requirements: None,
        }
        .validated()
        .unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "expiry_duration", .. }));
    }

    #[test]
    fn multiple_choice_needs_a_correct_option() {
        let err = mc(vec![QuestionOption::new("3", false), QuestionOption::new("8", false)])
            .validated()
            .unwrap_err();
        assert_eq!(err, ValidationError::NoCorrectOption);

        let ok = mc(vec![QuestionOption::new("3", true), QuestionOption::new("8", false)]).validated();
        assert!(ok.is_ok());
    }

    #[test]
    fn single_correct_option_is_enough() {
        let q = mc(vec![QuestionOption::new(" Class 3 ", true)]).validated().unwrap();
        assert_eq!(q.options.len(), 1);
        assert_eq!(q.options[0].text, "Class 3");

        assert_eq!(mc(vec![]).validated().unwrap_err(), ValidationError::NoCorrectOption);
    }

    #[test]
    fn multiple_choice_rejects_blank_options() {
        let err = mc(vec![QuestionOption::new("3", true), QuestionOption::new(" ", false)])
            .validated()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyOption(2));
    }

    #[test]
    fn true_false_answer_is_normalized() {
        let q = NewQuestion {
            text: "Placards are optional".into(),
            question_type: QuestionType::TrueFalse,
            options: vec![],
            correct_answer: Some(" FALSE ".into()),
            points: 1,
            explanation: Some(String::new()),
        }
        .validated()
        .unwrap();
        assert_eq!(q.correct_answer.as_deref(), Some("false"));
        assert!(q.explanation.is_none());

        let err = NewQuestion {
            correct_answer: Some("maybe".into()),
            ..q
        }
        .validated()
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidTrueFalseAnswer);
    }

    #[test]
    fn essay_carries_nothing_to_grade() {
        let err = NewQuestion {
            text: "Describe the placarding rules".into(),
            question_type: QuestionType::Essay,
            options: vec![],
            correct_answer: Some("true".into()),
            points: 5,
            explanation: None,
        }
        .validated()
        .unwrap_err();
        assert_eq!(err, ValidationError::UnexpectedCorrectAnswer("essay"));
    }

    #[test]
    fn zero_points_rejected() {
        let mut q = mc(vec![QuestionOption::new("a", true), QuestionOption::new("b", false)]);
        q.points = 0;
        assert!(matches!(
            q.validated().unwrap_err(),
            ValidationError::OutOfRange { field: "points", .. }
        ));
    }

    #[test]
    fn assessment_checks_bank_and_ranges() {
        let bank = vec![bank_question("q1"), bank_question("q2")];

        let ok = assessment(&["q1", "q2"]).validated(Some(&bank)).unwrap();
        assert!(ok.module_id.is_none());
        assert_eq!(ok.program_id.as_deref(), Some("p1"));

        let err = assessment(&["q1", "q9"]).validated(Some(&bank)).unwrap_err();
        assert_eq!(err, ValidationError::UnknownQuestion("q9".into()));

        let err = assessment(&["q1", "q1"]).validated(None).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateQuestion("q1".into()));

        let mut form = assessment(&["q1"]);
        form.pass_mark = 0;
        assert!(matches!(
            form.clone().validated(None),
            Err(ValidationError::OutOfRange { field: "pass_mark", .. })
        ));
        form.pass_mark = 101;
        assert!(form.clone().validated(None).is_err());
        form.pass_mark = 1;
        assert!(form.validated(None).is_ok());

        let mut form = assessment(&["q1"]);
        form.max_attempts = 0;
        assert!(form.validated(None).is_err());

        assert!(assessment(&[]).validated(None).is_err());
    }
}
