use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::consumer::HttpConsumerApi;
use crate::http::{DEFAULT_API_URL, HttpClient};
use crate::polling::PollOptions;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub publishable_key: String,
    pub timeout: Duration,
    pub poll: PollOptions,
}

impl Config {
    pub fn new(
        publishable_key: &str,
        api_url: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        if !publishable_key.starts_with("pk_") {
            anyhow::bail!("Invalid publishable key: expected a key starting with 'pk_'.");
        }
        debug!("Using publishable key {}", mask(publishable_key));

        Ok(Self {
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            publishable_key: publishable_key.to_string(),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            poll: PollOptions::default(),
        })
    }

    pub fn with_poll_options(mut self, poll: PollOptions) -> Self {
        self.poll = poll;
        self
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .user_agent(concat!("linkctl/", env!("LINKCTL_VERSION")))
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(HttpClient::new(client, &self.api_url, &self.publishable_key))
    }

    pub fn consumer_api(&self) -> Result<HttpConsumerApi> {
        Ok(HttpConsumerApi::new(self.http_client()?))
    }
}

/// `pk_test_abcdef123456` -> `pk_test_*********3456`
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
