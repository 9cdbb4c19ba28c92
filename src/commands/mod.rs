//! CLI use cases. Each command builds a [`LinkAccount`] from the
//! [`Config`], runs one operation and prints the result.

use anyhow::Result;

use crate::account::LinkAccount;
use crate::config::Config;
use crate::consumer::{ConsumerApi, ConsumerSession, HttpConsumerApi};

mod lookup;
mod payment_details;
mod session;
mod wait;

pub use lookup::lookup;
pub use payment_details::{delete, list, set_default};
pub use session::{log_out, refresh};
pub use wait::wait;

/// Resumes an account from a client secret obtained by an earlier lookup.
fn resume(config: &Config, email: &str, client_secret: &str) -> Result<LinkAccount<HttpConsumerApi>> {
    let session = ConsumerSession {
        client_secret: client_secret.to_string(),
        email_address: email.to_string(),
        redacted_phone_number: None,
        verification_sessions: Vec::new(),
    };
    Ok(LinkAccount::with_session(
        config.consumer_api()?,
        email,
        session,
        None,
    ))
}

/// Tells the user when a command had to refresh their session, since the old
/// client secret no longer works. Called whether or not the command succeeded.
async fn report_refreshed_secret<A: ConsumerApi>(account: &LinkAccount<A>, original: &str) {
    match account.session().await {
        Some(session) if session.client_secret != original => {
            eprintln!(
                "Session was refreshed; new client secret: {}",
                session.client_secret
            );
        }
        _ => {}
    }
}
