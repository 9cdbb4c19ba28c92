use anyhow::{Context, Result};
use log::debug;

use crate::account::LinkAccount;
use crate::config::Config;

/// Look up an account by email and print its session
#[tracing::instrument(skip(config))]
pub async fn lookup(config: &Config, email: &str) -> Result<()> {
    debug!("Looking up {} at {}", email, config.api_url);
    let account = LinkAccount::new(config.consumer_api()?, email);

    let status = account
        .lookup()
        .await
        .with_context(|| format!("Failed to look up {}", email))?;

    let session = account.session().await;
    println!("Email: {}", email);
    println!("Exists: {}", session.is_some());
    println!("Status: {}", status);

    if let Some(session) = session {
        if let Some(phone) = &session.redacted_phone_number {
            println!("Phone: {}", phone);
        }
        println!("Client secret: {}", session.client_secret);
    }
    if let Some(key) = account.publishable_key().await {
        println!("Publishable key: {}", key);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_existing_account() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/consumers/sessions/lookup")
            .match_body(mockito::Matcher::Json(json!({"email_address": "jane@example.com"})))
            .with_status(200)
            .with_body(
                json!({
                    "exists": true,
                    "consumer_session": {
                        "client_secret": "secret_1",
                        "email_address": "jane@example.com",
                        "verification_sessions": []
                    },
                    "publishable_key": "pk_consumer_1"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let config = Config::new("pk_test_123", Some(server.url()), None).unwrap();
        let result = lookup(&config, "jane@example.com").await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_lookup_server_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/consumers/sessions/lookup")
            .with_status(500)
            .create_async()
            .await;

        let config = Config::new("pk_test_123", Some(server.url()), None).unwrap();
        let result = lookup(&config, "jane@example.com").await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to look up jane@example.com"));
    }
}
