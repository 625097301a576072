//! Session commands: login, logout, status.

use crate::app::ShellState;
use bridge_engine::Collaborators;
use serde_json::json;
use shell_config_and_utils::{Config, Paths};

pub async fn login(
    config: &Config,
    paths: &Paths,
    id: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ShellState::build(config, paths, Collaborators::new())?;

    let user = state.engine.login(id, password).await?;
    println!("Logged in as {}", id);
    if let Some(user) = user {
        println!("{}", serde_json::to_string_pretty(&user)?);
    }
    Ok(())
}

pub async fn logout(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let state = ShellState::build(config, paths, Collaborators::new())?;

    if state.engine.access_token().is_none() {
        println!("No session stored");
        return Ok(());
    }
    state.engine.logout().await;
    println!("Logged out");
    Ok(())
}

/// Verify the stored session (refreshing if needed) and print a summary.
pub async fn status(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let state = ShellState::build(config, paths, Collaborators::new())?;

    let logged_in = state.engine.is_logged_in().await;
    let user = state
        .engine
        .current_user()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok());

    let summary = json!({
        "logged_in": logged_in,
        "user": user,
        "expires_at": state.secure.expires_at().map(|at| at.to_rfc3339()),
        "device_id": state.device.device_id(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
