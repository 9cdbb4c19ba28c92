//! Error types shared by the consumer client and the retry primitives.

use thiserror::Error;

/// Error code the API returns when the consumer session client secret is no
/// longer accepted.
pub const INVALID_CREDENTIALS_CODE: &str = "consumer_session_credentials_invalid";

/// How the retry primitives treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server is still working on the request; ask again later.
    RetryableProcessing,
    /// The session credentials expired; refresh once and replay.
    AuthenticationExpired,
    /// Anything else. Never retried.
    Terminal,
}

/// Errors that can be sorted into an [`ErrorKind`].
pub trait Classify {
    fn kind(&self) -> ErrorKind;

    fn is_processing(&self) -> bool {
        self.kind() == ErrorKind::RetryableProcessing
    }

    fn is_authentication_expired(&self) -> bool {
        self.kind() == ErrorKind::AuthenticationExpired
    }
}

/// Errors returned by the consumer API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// HTTP 202: the resource is not ready yet.
    #[error("request is still processing (HTTP {status})")]
    Processing { status: u16 },

    #[error("consumer session credentials are expired or invalid")]
    AuthenticationExpired,

    #[error("API error (HTTP {status}){}: {message}", code_suffix(.code))]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode API response: {0}")]
    Decode(String),

    #[error("no consumer session; look up or sign up first")]
    NoSession,
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{}]", c))
        .unwrap_or_default()
}

impl Classify for ApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Processing { .. } => ErrorKind::RetryableProcessing,
            ApiError::AuthenticationExpired => ErrorKind::AuthenticationExpired,
            _ => ErrorKind::Terminal,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::Decode(error.to_string())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}
