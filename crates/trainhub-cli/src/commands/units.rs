//! `trainhub units ...`

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_core::capability::Capability;
use trainhub_core::model::NewUnit;

use super::{table, Context};

#[derive(Subcommand)]
pub enum UnitsCommand {
    /// List the units of a module, in order
    List {
        #[arg(long)]
        module: String,
    },

    /// Add a unit to a module
    Create {
        #[arg(long)]
        module: String,

        #[arg(long)]
        title: String,

        /// Learning objective (repeatable)
        #[arg(long = "objective")]
        objectives: Vec<String>,

        /// Position within the module
        #[arg(long)]
        order: i32,
    },

    /// Replace a unit's fields
    Update {
        id: String,

        #[arg(long)]
        module: String,

        #[arg(long)]
        title: String,

        #[arg(long = "objective")]
        objectives: Vec<String>,

        #[arg(long)]
        order: i32,
    },

    /// Delete a unit and its content
    Delete { id: String },
}

pub async fn execute(config_path: Option<&Path>, cmd: UnitsCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let session = &mut ctx.session;

    match cmd {
        UnitsCommand::List { module } => {
            let units = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.list_units(&module).await
                })
                .await?;
            let mut t = table(vec!["Order", "ID", "Title", "Objectives"]);
            for u in &units {
                t.add_row(vec![
                    Cell::new(u.order),
                    Cell::new(&u.id),
                    Cell::new(&u.title),
                    Cell::new(u.learning_objectives.join("; ")),
                ]);
            }
            println!("{t}");
        }
        UnitsCommand::Create {
            module,
            title,
            objectives,
            order,
        } => {
            let unit = NewUnit {
                module_id: module,
                title,
                learning_objectives: objectives,
                order,
            }
            .validated()?;
            let created = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.create_unit(&unit).await
                })
                .await?;
            println!("Created unit {} ({})", created.title, created.id);
        }
        UnitsCommand::Update {
            id,
            module,
            title,
            objectives,
            order,
        } => {
            let unit = NewUnit {
                module_id: module,
                title,
                learning_objectives: objectives,
                order,
            }
            .validated()?;
            let updated = session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.update_unit(&id, &unit).await
                })
                .await?;
            println!("Updated unit {} ({})", updated.title, updated.id);
        }
        UnitsCommand::Delete { id } => {
            let deleted = id.clone();
            session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.delete_unit(&id).await
                })
                .await?;
            println!("Deleted unit {deleted}");
        }
    }
    Ok(())
}
