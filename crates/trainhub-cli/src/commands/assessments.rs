//! `trainhub assessments ...`

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_client::session::Session;
use trainhub_core::capability::Capability;
use trainhub_core::engine::AssessmentTaker;
use trainhub_core::model::{Answer, AssessmentResult, NewAssessment, Question, QuestionType};

use super::{read_line, table, Context};

#[derive(Subcommand)]
pub enum AssessmentsCommand {
    /// List assessments
    List,

    /// Compose an assessment from the question bank
    Create {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Question id (repeatable, in order)
        #[arg(long = "question", required = true)]
        questions: Vec<String>,

        #[arg(long)]
        program: Option<String>,

        #[arg(long)]
        module: Option<String>,

        #[arg(long)]
        unit: Option<String>,

        /// Percentage needed to pass
        #[arg(long, default_value = "80")]
        pass_mark: u32,

        #[arg(long, default_value = "3")]
        max_attempts: u32,

        /// Minutes
        #[arg(long)]
        time_limit: Option<u32>,

        #[arg(long)]
        randomize: bool,
    },

    /// Take an assessment, answering on stdin
    ///
    /// Type an option number, true/false or free text per question. An empty
    /// line skips, `<` and `>` move between questions, `submit` finishes and
    /// `quit` abandons the attempt.
    Take { id: String },
}

pub async fn execute(config_path: Option<&Path>, cmd: AssessmentsCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        AssessmentsCommand::List => {
            let assessments = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.list_assessments().await
                })
                .await?;
            let mut t = table(vec![
                "ID",
                "Title",
                "Questions",
                "Pass mark",
                "Attempts",
                "Time limit",
            ]);
            for a in &assessments {
                t.add_row(vec![
                    Cell::new(&a.id),
                    Cell::new(&a.title),
                    Cell::new(a.question_ids.len()),
                    Cell::new(format!("{}%", a.pass_mark)),
                    Cell::new(a.max_attempts),
                    Cell::new(
                        a.time_limit
                            .map(|m| format!("{m} min"))
                            .unwrap_or_else(|| "-".into()),
                    ),
                ]);
            }
            println!("{t}");
        }
        AssessmentsCommand::Create {
            title,
            description,
            questions,
            program,
            module,
            unit,
            pass_mark,
            max_attempts,
            time_limit,
            randomize,
        } => {
            let form = NewAssessment {
                title,
                description,
                program_id: program,
                module_id: module,
                unit_id: unit,
                question_ids: questions,
                pass_mark,
                max_attempts,
                time_limit,
                randomize_questions: randomize,
            };
            let bank = session
                .authorized(Capability::ManageAssessments, |api| async move {
                    api.list_questions().await
                })
                .await?;
            let assessment = form.validated(Some(bank.as_slice()))?;

            let created = session
                .authorized(Capability::ManageAssessments, |api| async move {
                    api.create_assessment(&assessment).await
                })
                .await?;
            println!(
                "Created assessment {} ({}, {} questions)",
                created.title,
                created.id,
                created.question_ids.len()
            );
        }
        AssessmentsCommand::Take { id } => {
            let stdin = std::io::stdin();
            take(session, &id, &mut stdin.lock()).await?;
        }
    }
    Ok(())
}

async fn take(session: &mut Session, assessment_id: &str, input: &mut impl BufRead) -> Result<()> {
    session.require(Capability::TakeAssessments)?;
    let mut taker = AssessmentTaker::new(session.api());

    let started = taker.start(assessment_id).await;
    session.guard(started)?;

    let total = taker.attempt().map_or(0, |a| a.len());
    let ungraded = taker.attempt().map_or(0, |a| {
        a.questions()
            .iter()
            .filter(|q| !q.question_type.is_auto_scored())
            .count()
    });
    println!("{total} questions. Empty line skips, < and > navigate, `submit` finishes.\n");

    loop {
        let Some(attempt) = taker.attempt() else {
            bail!("no attempt in progress");
        };
        let Some(question) = taker.current_question().cloned() else {
            bail!("no attempt in progress");
        };
        print_question(&question, attempt.index(), total, attempt.answer(&question.id));
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line(input)? else {
            bail!("input ended before the attempt was submitted");
        };

        match line.trim() {
            "" => {
                if taker.attempt().is_some_and(|a| a.is_last()) {
                    println!("Last question. Type `submit` to finish.");
                } else {
                    taker.next();
                }
            }
            "<" => {
                taker.previous();
            }
            ">" => {
                taker.next();
            }
            "quit" => bail!("attempt abandoned"),
            "submit" => {
                let answered = taker.attempt().map_or(0, |a| a.answered_count());
                let submitted = taker.submit().await.cloned();
                match session.guard(submitted) {
                    Ok(result) => {
                        print_result(&result, answered, total, ungraded);
                        return Ok(());
                    }
                    Err(e) if e.is_auth_failure() => return Err(e.into()),
                    Err(e) => {
                        eprintln!("Error: {}", e.user_message());
                        eprintln!("Your answers are kept. Type `submit` to try again.");
                        taker.dismiss_error();
                    }
                }
            }
            text => match parse_answer(&question, text) {
                Ok(answer) => match taker.record_answer(&question.id, answer) {
                    Ok(()) => {
                        if taker.attempt().is_some_and(|a| a.is_last()) {
                            println!("Answer saved. Type `submit` to finish.");
                        } else {
                            taker.next();
                        }
                    }
                    Err(e) => eprintln!("{}", e.user_message()),
                },
                Err(message) => eprintln!("{message}"),
            },
        }
    }
}

/// Turn a typed line into an answer for `question`.
fn parse_answer(question: &Question, text: &str) -> Result<Answer, String> {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let count = question.options.len();
            text.parse::<usize>()
                .ok()
                .filter(|n| (1..=count).contains(n))
                .and_then(|n| question.option_key(n - 1))
                .map(Answer::SelectedOption)
                .ok_or_else(|| format!("Pick an option between 1 and {count}."))
        }
        QuestionType::TrueFalse => match text.to_lowercase().as_str() {
            "t" | "true" | "y" | "yes" => Ok(Answer::Text("true".into())),
            "f" | "false" | "n" | "no" => Ok(Answer::Text("false".into())),
            _ => Err("Answer true or false.".into()),
        },
        QuestionType::Essay => Ok(Answer::Text(text.to_string())),
    }
}

fn print_question(question: &Question, index: usize, total: usize, answer: Option<&Answer>) {
    println!(
        "[{}/{}] {} ({} {})",
        index + 1,
        total,
        question.text,
        question.points,
        if question.points == 1 { "point" } else { "points" }
    );
    match question.question_type {
        QuestionType::MultipleChoice => {
            for (i, option) in question.options.iter().enumerate() {
                let chosen = matches!(
                    answer,
                    Some(Answer::SelectedOption(key)) if question.option_key(i).as_ref() == Some(key)
                );
                println!("  {} {}) {}", if chosen { "*" } else { " " }, i + 1, option.text);
            }
        }
        QuestionType::TrueFalse => println!("  (true/false)"),
        QuestionType::Essay => println!("  (free text, graded by an instructor)"),
    }
    if let Some(Answer::Text(text)) = answer {
        println!("  current answer: {text}");
    }
}

fn print_result(result: &AssessmentResult, answered: usize, total: usize, ungraded: usize) {
    println!();
    println!("Answered {answered} of {total} questions.");
    println!(
        "Score: {}/{} points ({:.1}%)",
        result.earned_points, result.total_points, result.percentage
    );
    if ungraded > 0 {
        println!("{ungraded} free-text answers are not part of the score.");
    }
    if result.is_passed {
        println!("Result: PASSED");
    } else {
        println!("Result: NOT PASSED");
    }
    if result.certificate_generated == Some(true) {
        println!("A certificate was issued. Run: trainhub certificates list");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainhub_core::model::QuestionOption;

    fn mc() -> Question {
        Question {
            id: "q1".into(),
            text: "Which class is flammable gas?".into(),
            question_type: QuestionType::MultipleChoice,
            options: vec![
                QuestionOption {
                    id: "o1".into(),
                    text: "Class 2.1".into(),
                    is_correct: true,
                },
                QuestionOption {
                    id: "o2".into(),
                    text: "Class 8".into(),
                    is_correct: false,
                },
            ],
            correct_answer: None,
            points: 2,
            explanation: None,
        }
    }

    #[test]
    fn option_numbers_map_to_ids() {
        assert_eq!(
            parse_answer(&mc(), "2"),
            Ok(Answer::SelectedOption("o2".into()))
        );
        assert!(parse_answer(&mc(), "0").is_err());
        assert!(parse_answer(&mc(), "3").is_err());
        assert!(parse_answer(&mc(), "Class 8").is_err());
    }

    #[test]
    fn true_false_shorthands() {
        let q = Question {
            question_type: QuestionType::TrueFalse,
            options: vec![],
            correct_answer: Some("true".into()),
            ..mc()
        };
        assert_eq!(parse_answer(&q, "Y"), Ok(Answer::Text("true".into())));
        assert_eq!(parse_answer(&q, "false"), Ok(Answer::Text("false".into())));
        assert!(parse_answer(&q, "maybe").is_err());
    }
}
