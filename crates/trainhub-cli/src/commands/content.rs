//! `trainhub content ...`

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::Subcommand;
use comfy_table::Cell;

use trainhub_client::session::Session;
use trainhub_core::capability::Capability;
use trainhub_core::model::ContentItem;
use trainhub_core::progress::{completes_on_load, ProgressPolicy, ProgressTracker};
use trainhub_core::ApiError;

use super::{date, table, Context};

#[derive(Subcommand)]
pub enum ContentCommand {
    /// List the content items of a unit
    List {
        #[arg(long)]
        unit: String,
    },

    /// Upload a file to a unit
    Upload {
        #[arg(long)]
        unit: String,

        #[arg(long)]
        file: PathBuf,

        /// Name to store the file under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Save a content item to disk
    Download {
        id: String,

        /// Unit the item belongs to
        #[arg(long)]
        unit: String,

        #[arg(long)]
        out: PathBuf,
    },

    /// Mark a pdf, document or image as done
    Complete {
        id: String,

        /// Unit the item belongs to
        #[arg(long)]
        unit: String,
    },

    /// Delete a content item
    Delete { id: String },

    /// Show stored progress for a content item
    Progress { id: String },
}

pub async fn execute(config_path: Option<&Path>, cmd: ContentCommand) -> Result<()> {
    let mut ctx = Context::open(config_path).await?;
    let policy = ctx.config.progress.clone();
    let session = &mut ctx.session;

    match cmd {
        ContentCommand::List { unit } => {
            let items = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.list_unit_content(&unit).await
                })
                .await?;
            let mut t = table(vec!["ID", "Title", "Type", "Size", "Uploaded"]);
            for item in &items {
                t.add_row(vec![
                    Cell::new(&item.id),
                    Cell::new(&item.title),
                    Cell::new(item.content_type),
                    Cell::new(format!("{} bytes", item.file_size)),
                    Cell::new(date(item.created_at)),
                ]);
            }
            println!("{t}");
        }
        ContentCommand::Upload { unit, file, name } => {
            session.require(Capability::UploadContent)?;
            let file_name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .with_context(|| format!("not a file: {}", file.display()))?,
            };
            let bytes = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let item = session
                .authorized(Capability::UploadContent, |api| async move {
                    api.upload_content(&unit, &file_name, bytes).await
                })
                .await?;
            println!(
                "Uploaded {} as {} ({} bytes, {})",
                item.title, item.content_type, item.file_size, item.id
            );
        }
        ContentCommand::Download { id, unit, out } => {
            let item = find_item(session, &unit, &id).await?;
            let content_id = item.id.clone();
            let bytes = session
                .authorized(Capability::ViewStructure, |api| async move {
                    api.stream_content(&content_id).await
                })
                .await?;
            std::fs::write(&out, &bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Saved {} ({} bytes) to {}", item.title, bytes.len(), out.display());

            if completes_on_load(item.content_type)
                && session.capabilities().allows(Capability::TrackProgress)
            {
                report_completion(session, &item, &policy).await?;
            }
        }
        ContentCommand::Complete { id, unit } => {
            session.require(Capability::TrackProgress)?;
            let item = find_item(session, &unit, &id).await?;
            if item.content_type.is_media() {
                bail!(
                    "{} is {}; it completes through playback",
                    item.title,
                    item.content_type
                );
            }
            report_completion(session, &item, &policy).await?;
        }
        ContentCommand::Delete { id } => {
            let deleted = id.clone();
            session
                .authorized(Capability::ManageStructure, |api| async move {
                    api.delete_content(&id).await
                })
                .await?;
            println!("Deleted content {deleted}");
        }
        ContentCommand::Progress { id } => {
            let progress = session
                .authorized(Capability::TrackProgress, |api| async move {
                    api.content_progress(&id).await
                })
                .await?;
            println!("progress:  {:.0}%", progress.progress_percentage);
            println!("position:  {:.1}s", progress.last_position);
            println!("time:      {}s", progress.time_spent);
            println!(
                "completed: {}",
                if progress.completed { "yes" } else { "no" }
            );
        }
    }
    Ok(())
}

async fn find_item(session: &mut Session, unit_id: &str, content_id: &str) -> Result<ContentItem> {
    let unit = unit_id.to_string();
    let items = session
        .authorized(Capability::ViewStructure, |api| async move {
            api.list_unit_content(&unit).await
        })
        .await?;
    items
        .into_iter()
        .find(|item| item.id == content_id)
        .ok_or_else(|| ApiError::NotFound(format!("no content {content_id} in unit {unit_id}")))
        .map_err(Into::into)
}

/// Report static completion through the tracker and wait for delivery.
async fn report_completion(
    session: &mut Session,
    item: &ContentItem,
    policy: &ProgressPolicy,
) -> Result<()> {
    session.require(Capability::TrackProgress)?;
    let tracker = ProgressTracker::new(session.api());
    if !tracker.mark_complete(&item.id, item.content_type, policy) {
        return Ok(());
    }
    tracker.flush().await;

    if tracker.failures() > 0 {
        // best effort: the server copy stays as it was
        eprintln!("Warning: progress for {} could not be saved", item.title);
    } else {
        println!("Marked {} complete", item.title);
    }
    Ok(())
}
