pub mod assessments;
pub mod auth;
pub mod certificates;
pub mod content;
pub mod health;
pub mod init;
pub mod modules;
pub mod programs;
pub mod questions;
pub mod units;

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use comfy_table::Table;

use trainhub_client::config::{load_config_from, TrainhubConfig};
use trainhub_client::session::Session;

/// Loaded configuration plus the session built from it.
pub struct Context {
    pub config: TrainhubConfig,
    pub session: Session,
}

impl Context {
    /// Configuration and an anonymous session; no request is made.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let session = Session::from_config(&config)
            .with_context(|| format!("cannot use backend at {}", config.base_url))?;
        Ok(Self { config, session })
    }

    /// Like [`Context::load`], then pick up the stored login if there is one.
    pub async fn open(config_path: Option<&Path>) -> Result<Self> {
        let mut ctx = Self::load(config_path)?;
        let restored = ctx
            .session
            .restore()
            .await
            .context("could not restore the saved session")?;
        tracing::debug!(base_url = %ctx.config.base_url, restored, "session ready");
        Ok(ctx)
    }
}

pub fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_header(header);
    table
}

pub fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// One line from stdin, without the trailing newline. `None` at end of input.
pub fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line).context("failed to read stdin")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// The given password, or the first line of stdin.
pub fn password_or_stdin(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => {
            eprint!("Password: ");
            read_line(&mut std::io::stdin().lock())?
                .context("no password given on stdin")
        }
    }
}
