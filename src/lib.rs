pub mod account;
pub mod auth_retry;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod polling;

pub use account::{AccountStatus, LinkAccount};
pub use auth_retry::{AuthRetryingClient, SessionRefresher, retry_on_auth_error};
pub use error::{ApiError, Classify, ErrorKind};
pub use polling::{PollError, PollHandle, PollOptions, PollOutcome, Poller, poll_until_ready};
