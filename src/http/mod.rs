//! HTTP client module with response classification.

mod client;
mod response;

pub use client::{DEFAULT_API_URL, HttpClient};
pub use response::{ErrorDetail, PROCESSING_STATUS, classify_response};
