//! JSON-over-HTTP client for the consumer API.

use log::debug;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::response::{PROCESSING_STATUS, classify_response};
use crate::error::ApiError;

pub const DEFAULT_API_URL: &str = "https://api.stripe.com";

/// HTTP client that authenticates with a publishable key and turns error
/// responses into [`ApiError`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    publishable_key: String,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client, base_url: &str, publishable_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
        }
    }

    /// POSTs a JSON body and deserializes the JSON response.
    ///
    /// `publishable_key` overrides the client's default key for this request.
    #[tracing::instrument(skip(self, body, publishable_key))]
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        publishable_key: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body, publishable_key)
            .await
    }

    /// Sends a DELETE with a JSON body and deserializes the JSON response.
    #[tracing::instrument(skip(self, body, publishable_key))]
    pub async fn delete_json<B, T>(
        &self,
        path: &str,
        body: &B,
        publishable_key: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::DELETE, path, body, publishable_key)
            .await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        publishable_key: Option<&str>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}...", method, url);

        let request = self
            .client
            .request(method, &url)
            .bearer_auth(publishable_key.unwrap_or(&self.publishable_key))
            .json(body);

        self.execute(request).await
    }

    /// Single request without any retry.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() && status != PROCESSING_STATUS {
            let bytes = response.bytes().await?;
            return serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let error = classify_response(status, &body);
        debug!("Request failed with HTTP {}: {}", status.as_u16(), error);
        Err(error)
    }
}
