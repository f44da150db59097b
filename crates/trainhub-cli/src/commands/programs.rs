//! `trainhub programs ...`

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use comfy_table::Cell;

use trainhub_core::capability::Capability;
use trainhub_core::model::{ContentItem, NewProgram, Program, ProgramStructure};
use trainhub_core::traits::unit_content;
use trainhub_core::ApiError;

use super::{date, table, Context};

#[derive(Subcommand)]
pub enum ProgramsCommand {
    /// List all programs
    List,

    /// Show one program
    Show { id: String },

    /// Create a program
    Create(ProgramForm),

    /// Replace a program's details
    Update {
        id: String,

        #[command(flatten)]
        form: ProgramForm,
    },

    /// Delete a program with its modules and units
    Delete { id: String },

    /// Print the program -> module -> unit -> content tree
    Structure {
        id: String,

        /// Skip fetching content items per unit
        #[arg(long)]
        no_content: bool,
    },

    /// Show your progress through a program
    Progress { id: String },
}

#[derive(Args)]
pub struct ProgramForm {
    #[arg(long)]
    title: String,

    #[arg(long, default_value = "")]
    description: String,

    /// Learning objective (repeatable)
    #[arg(long = "objective")]
    objectives: Vec<String>,

    /// Certificate validity in months
    #[arg(long)]
    expiry_months: u32,

    #[arg(long)]
    renewal: Option<String>,
}

impl ProgramForm {
    fn into_new_program(self) -> NewProgram {
        NewProgram {
            title: self.title,
            description: self.description,
            learning_objectives: self.objectives,
            expiry_duration: self.expiry_months,
            renewal_requirements: self.renewal,
        }
    }
}

pub async fn execute(config_path: Option<&Path>, cmd: ProgramsCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        ProgramsCommand::List => {
            let programs = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.list_programs().await
                })
                .await?;
            if programs.is_empty() {
                println!("No programs yet.");
                return Ok(());
            }
            let mut t = table(vec!["ID", "Title", "Objectives", "Expiry", "Created"]);
            for p in &programs {
                t.add_row(vec![
                    Cell::new(&p.id),
                    Cell::new(&p.title),
                    Cell::new(p.learning_objectives.len()),
                    Cell::new(format!("{} months", p.expiry_duration)),
                    Cell::new(date(p.created_at)),
                ]);
            }
            println!("{t}");
        }
        ProgramsCommand::Show { id } => {
            let program = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.get_program(&id).await
                })
                .await?;
            print_program(&program);
        }
        ProgramsCommand::Create(form) => {
            let program = form.into_new_program().validated()?;
            let created = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.create_program(&program).await
                })
                .await?;
            println!("Created program {} ({})", created.title, created.id);
        }
        ProgramsCommand::Update { id, form } => {
            let program = form.into_new_program().validated()?;
            let updated = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.update_program(&id, &program).await
                })
                .await?;
            println!("Updated program {} ({})", updated.title, updated.id);
        }
        ProgramsCommand::Delete { id } => {
            let deleted = id.clone();
            session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.delete_program(&id).await
                })
                .await?;
            println!("Deleted program {deleted}");
        }
        ProgramsCommand::Structure { id, no_content } => {
            let (structure, content) = session
                .authorized(Capability::ViewStructure, |api| async move {
                    let structure = api.program_structure(&id).await?;
                    let content = if no_content {
                        Vec::new()
                    } else {
                        unit_content(api.as_ref(), &structure).await?
                    };
                    Ok::<_, ApiError>((structure, content))
                })
                .await?;
            print_structure(&structure, &content);
        }
        ProgramsCommand::Progress { id } => {
            let progress = session
                .authorized(Capability::TrackProgress, |api| async move {
                    api.program_progress(&id).await
                })
                .await?;
            println!(
                "{:.0}% complete ({}/{} items)",
                progress.overall_percentage, progress.completed_items, progress.total_items
            );
            if !progress.content.is_empty() {
                let mut t = table(vec!["Content", "Progress", "Time spent", "Completed"]);
                for item in &progress.content {
                    t.add_row(vec![
                        Cell::new(&item.content_id),
                        Cell::new(format!("{:.0}%", item.progress_percentage)),
                        Cell::new(format!("{}s", item.time_spent)),
                        Cell::new(if item.completed { "yes" } else { "no" }),
                    ]);
                }
                println!("{t}");
            }
        }
    }
    Ok(())
}

fn print_program(program: &Program) {
    println!("{} ({})", program.title, program.id);
    if !program.description.is_empty() {
        println!("{}", program.description);
    }
    println!("Certificates valid for {} months", program.expiry_duration);
    if let Some(renewal) = &program.renewal_requirements {
        println!("Renewal: {renewal}");
    }
    if !program.learning_objectives.is_empty() {
        println!("Objectives:");
        for objective in &program.learning_objectives {
            println!("  - {objective}");
        }
    }
}

/// `content` holds one entry per unit in tree order, or is empty.
fn print_structure(structure: &ProgramStructure, content: &[Vec<ContentItem>]) {
    println!(
        "{} ({} modules, {} units)",
        structure.program.title,
        structure.modules.len(),
        structure.unit_count()
    );

    let mut unit_content = content.iter();
    for (m, node) in structure.modules.iter().enumerate() {
        println!("  {}. {}", m + 1, node.module.title);
        for (u, unit) in node.units.iter().enumerate() {
            println!("     {}.{} {}", m + 1, u + 1, unit.title);
            for item in unit_content.next().into_iter().flatten() {
                println!(
                    "          [{}] {} ({} bytes, {})",
                    item.content_type, item.title, item.file_size, item.id
                );
            }
        }
    }
}
