//! `login`, `register`, `logout` and `whoami`.

use std::path::Path;

use anyhow::Result;

use trainhub_core::model::{NewUser, Role};

use super::{password_or_stdin, Context};

pub async fn login(
    config_path: Option<&Path>,
    username: String,
    password: Option<String>,
) -> Result<()> {
    let password = password_or_stdin(password)?;
    let mut ctx = Context::load(config_path)?;

    let user = ctx.session.login(&username, &password).await?;
    println!("Logged in as {} ({})", user.username, user.role);
    Ok(())
}

pub async fn register(
    config_path: Option<&Path>,
    username: String,
    email: String,
    password: Option<String>,
    full_name: String,
    role: Role,
) -> Result<()> {
    let password = password_or_stdin(password)?;
    let ctx = Context::load(config_path)?;

    let user = ctx
        .session
        .register(&NewUser {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password,
            full_name: full_name.trim().to_string(),
            role,
        })
        .await?;
    println!("Registered {} ({})", user.username, user.role);
    println!("Run: trainhub login --username {}", user.username);
    Ok(())
}

pub fn logout(config_path: Option<&Path>) -> Result<()> {
    let mut ctx = Context::load(config_path)?;
    ctx.session.logout()?;
    println!("Logged out.");
    Ok(())
}

pub async fn whoami(config_path: Option<&Path>) -> Result<()> {
    let ctx = Context::open(config_path).await?;

    match ctx.session.user() {
        Some(user) => {
            println!("{} <{}>", user.full_name, user.email);
            println!("username: {}", user.username);
            println!("role:     {}", user.role);
            let allowed: Vec<String> = ctx
                .session
                .capabilities()
                .iter()
                .map(|c| c.to_string())
                .collect();
            println!("may:      {}", allowed.join(", "));
        }
        None => println!("Not logged in."),
    }
    Ok(())
}
