//! The `trainhub init` command.

use anyhow::Result;

use trainhub_client::config::SAMPLE_CONFIG;

pub fn execute() -> Result<()> {
    if std::path::Path::new("trainhub.toml").exists() {
        println!("trainhub.toml already exists, skipping.");
    } else {
        std::fs::write("trainhub.toml", SAMPLE_CONFIG)?;
        println!("Created trainhub.toml");
    }

    println!("\nNext steps:");
    println!("  1. Point base_url in trainhub.toml at your backend");
    println!("  2. Run: trainhub health");
    println!("  3. Run: trainhub login --username <name>");

    Ok(())
}
