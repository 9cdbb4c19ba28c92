use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

use crate::config::Config;

use super::{report_refreshed_secret, resume};

/// Wait until a payment method has finished processing.
///
/// Ctrl-C cancels the poll.
#[tracing::instrument(skip(config, client_secret))]
pub async fn wait(config: &Config, email: &str, client_secret: &str, id: &str) -> Result<()> {
    let account = Arc::new(resume(config, email, client_secret)?);
    info!(
        "Waiting for {} (up to {:?})...",
        id,
        config.poll.max_wait()
    );

    let handle = account.spawn_wait_for_payment_details(id, config.poll);
    let cancel = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling poll");
            cancel.cancel();
        }
    });

    let result = handle.wait().await;
    interrupt.abort();

    report_refreshed_secret(&account, client_secret).await;
    let details = result.with_context(|| format!("Payment method {} is not ready", id))?;

    println!("Ready: {}", details);
    Ok(())
}
