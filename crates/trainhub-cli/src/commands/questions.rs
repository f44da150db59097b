//! `trainhub questions ...`

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_core::capability::Capability;
use trainhub_core::model::{NewQuestion, QuestionOption, QuestionType};

use super::{table, Context};

#[derive(Subcommand)]
pub enum QuestionsCommand {
    /// List the question bank
    List {
        /// Also print options and answers
        #[arg(long)]
        details: bool,
    },

    /// Add a question to the bank
    Create {
        #[arg(long)]
        text: String,

        /// multiple_choice, true_false or essay
        #[arg(long = "type")]
        question_type: QuestionType,

        /// Answer option (repeatable, multiple choice only)
        #[arg(long = "option")]
        options: Vec<String>,

        /// 1-based number of a correct option (repeatable)
        #[arg(long = "correct")]
        correct: Vec<usize>,

        /// "true" or "false" (true/false only)
        #[arg(long)]
        answer: Option<String>,

        #[arg(long, default_value = "1")]
        points: u32,

        #[arg(long)]
        explanation: Option<String>,
    },
}

pub async fn execute(config_path: Option<&Path>, cmd: QuestionsCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        QuestionsCommand::List { details } => {
            let questions = session
                .authorized(Capability::ManageQuestions, |api| async move {
                    api.list_questions().await
                })
                .await?;
            if questions.is_empty() {
                println!("The question bank is empty.");
                return Ok(());
            }
            let mut t = table(vec!["ID", "Type", "Points", "Question"]);
            for q in &questions {
                t.add_row(vec![
                    Cell::new(&q.id),
                    Cell::new(q.question_type),
                    Cell::new(q.points),
                    Cell::new(&q.text),
                ]);
            }
            println!("{t}");

            if details {
                for q in &questions {
                    println!("\n{} {}", q.id, q.text);
                    for (i, option) in q.options.iter().enumerate() {
                        let mark = if option.is_correct { "*" } else { " " };
                        println!("  {mark} {}) {}", i + 1, option.text);
                    }
                    if let Some(answer) = &q.correct_answer {
                        println!("  answer: {answer}");
                    }
                    if let Some(explanation) = &q.explanation {
                        println!("  explanation: {explanation}");
                    }
                }
            }
        }
        QuestionsCommand::Create {
            text,
            question_type,
            options,
            correct,
            answer,
            points,
            explanation,
        } => {
            if let Some(n) = correct.iter().find(|&&n| n == 0 || n > options.len()) {
                bail!("--correct {n} does not name one of the {} options", options.len());
            }
            let options = options
                .into_iter()
                .enumerate()
                .map(|(i, text)| QuestionOption::new(text, correct.contains(&(i + 1))))
                .collect();
            let question = NewQuestion {
                text,
                question_type,
                options,
                correct_answer: answer,
                points,
                explanation,
            }
            .validated()?;

            let created = session
                .authorized(Capability::ManageQuestions, |api| async move {
                    api.create_question(&question).await
                })
                .await?;
            println!(
                "Created {} question {} ({} points)",
                created.question_type, created.id, created.points
            );
        }
    }
    Ok(())
}

