//! Maps non-success HTTP responses to [`ApiError`].

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{ApiError, INVALID_CREDENTIALS_CODE};

/// Status the API answers with while a resource is still being prepared.
pub const PROCESSING_STATUS: StatusCode = StatusCode::ACCEPTED;

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

/// The `error` object of an API error body.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

/// Classifies a response that the caller could not use as a result.
///
/// - 202 means "still processing"
/// - 401, or an invalid-credentials error code on any status, means the
///   session expired
/// - everything else is a terminal API error
pub fn classify_response(status: StatusCode, body: &str) -> ApiError {
    if status == PROCESSING_STATUS {
        return ApiError::Processing {
            status: status.as_u16(),
        };
    }

    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED
        || detail.code.as_deref() == Some(INVALID_CREDENTIALS_CODE)
    {
        return ApiError::AuthenticationExpired;
    }

    let message = detail.message.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    ApiError::Api {
        status: status.as_u16(),
        code: detail.code,
        message,
    }
}
