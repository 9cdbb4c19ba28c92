use anyhow::{Context, Result};

use crate::config::Config;

use super::resume;

/// Refresh a session and print the new client secret
#[tracing::instrument(skip(config, client_secret))]
pub async fn refresh(config: &Config, email: &str, client_secret: &str) -> Result<()> {
    let account = resume(config, email, client_secret)?;

    account
        .refresh_session()
        .await
        .context("Failed to refresh session")?;

    if let Some(session) = account.session().await {
        println!("Client secret: {}", session.client_secret);
        // Without verification sessions the status would be a guess.
        if !session.verification_sessions.is_empty() {
            println!("Status: {}", account.status().await);
        }
    }
    Ok(())
}

/// End a session
#[tracing::instrument(skip(config, client_secret))]
pub async fn log_out(config: &Config, email: &str, client_secret: &str) -> Result<()> {
    let account = resume(config, email, client_secret)?;
    account.log_out().await.context("Failed to log out")?;
    println!("Logged out {}", email);
    Ok(())
}
