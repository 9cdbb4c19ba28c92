use anyhow::{Context, Result};
use log::info;

use crate::config::Config;

use super::{report_refreshed_secret, resume};

/// List saved payment methods
#[tracing::instrument(skip(config, client_secret))]
pub async fn list(config: &Config, email: &str, client_secret: &str) -> Result<()> {
    let account = resume(config, email, client_secret)?;

    let result = account.list_payment_details().await;
    report_refreshed_secret(&account, client_secret).await;
    let details = result.context("Failed to list payment methods")?;

    if details.is_empty() {
        println!("No saved payment methods.");
        return Ok(());
    }
    for item in details {
        println!("{}", item);
    }
    Ok(())
}

/// Delete a saved payment method
#[tracing::instrument(skip(config, client_secret))]
pub async fn delete(config: &Config, email: &str, client_secret: &str, id: &str) -> Result<()> {
    let account = resume(config, email, client_secret)?;

    let result = account.delete_payment_details(id).await;
    report_refreshed_secret(&account, client_secret).await;
    let deleted = result.with_context(|| format!("Failed to delete payment method {}", id))?;

    if !deleted.deleted {
        anyhow::bail!("Payment method {} was not deleted.", id);
    }
    info!("Deleted {}", deleted.id);
    println!("Deleted {}", deleted.id);
    Ok(())
}

/// Make a saved payment method the default
#[tracing::instrument(skip(config, client_secret))]
pub async fn set_default(config: &Config, email: &str, client_secret: &str, id: &str) -> Result<()> {
    let account = resume(config, email, client_secret)?;

    let result = account.set_default_payment_details(id).await;
    report_refreshed_secret(&account, client_secret).await;
    let details = result.with_context(|| format!("Failed to update payment method {}", id))?;

    println!("{}", details);
    Ok(())
}
