//! `trainhub modules ...`

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_core::capability::Capability;
use trainhub_core::model::NewModule;

use super::{table, Context};

#[derive(Subcommand)]
pub enum ModulesCommand {
    /// List the modules of a program, in order
    List {
        #[arg(long)]
        program: String,
    },

    /// Add a module to a program
    Create {
        #[arg(long)]
        program: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Position within the program
        #[arg(long)]
        order: i32,
    },

    /// Replace a module's fields
    Update {
        id: String,

        #[arg(long)]
        program: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        order: i32,
    },

    /// Delete a module and its units
    Delete { id: String },
}

pub async fn execute(config_path: Option<&Path>, cmd: ModulesCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        ModulesCommand::List { program } => {
            let modules = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.list_modules(&program).await
                })
                .await?;
            let mut t = table(vec!["Order", "ID", "Title", "Description"]);
            for m in &modules {
                t.add_row(vec![
                    Cell::new(m.order),
                    Cell::new(&m.id),
                    Cell::new(&m.title),
                    Cell::new(&m.description),
                ]);
            }
            println!("{t}");
        }
        ModulesCommand::Create {
            program,
            title,
            description,
            order,
        } => {
            let module = NewModule {
                program_id: program,
                title,
                description,
                order,
            }
            .validated()?;
            let created = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.create_module(&module).await
                })
                .await?;
            println!("Created module {} ({})", created.title, created.id);
        }
        ModulesCommand::Update {
            id,
            program,
            title,
            description,
            order,
        } => {
            let module = NewModule {
                program_id: program,
                title,
                description,
                order,
            }
            .validated()?;
            let updated = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.update_module(&id, &module).await
                })
                .await?;
            println!("Updated module {} ({})", updated.title, updated.id);
        }
        ModulesCommand::Delete { id } => {
            let deleted = id.clone();
            session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.delete_module(&id).await
                })
                .await?;
            println!("Deleted module {deleted}");
        }
    }
    Ok(())
}
