//! The `trainhub health` command.

use std::path::Path;

use anyhow::{Context as _, Result};

use trainhub_client::config::load_config_from;
use trainhub_core::traits::TrainingApi;

pub async fn execute(config_path: Option<&Path>) -> Result<()> {
    let config = load_config_from(config_path)?;
    let client = config.client()?;

    let health = client
        .health()
        .await
        .with_context(|| format!("backend at {} is not reachable", config.base_url))?;

    if health.message.is_empty() {
        println!("{}: {}", config.base_url, health.status);
    } else {
        println!("{}: {} ({})", config.base_url, health.status, health.message);
    }
    Ok(())
}
