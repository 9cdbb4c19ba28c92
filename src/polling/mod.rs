//! Poll an asynchronous operation until the server reports it is ready.
//!
//! The loop waits `initial_delay`, then calls the operation. A failure that
//! classifies as [`ErrorKind::RetryableProcessing`](crate::error::ErrorKind)
//! consumes one retry and schedules the next attempt after `retry_interval`;
//! any other failure ends the poll immediately.
//!
//! # Structure
//!
//! - `options` - Timing and retry budget
//! - `poller` - The loop itself, the spawned form, and its handles

mod options;
mod poller;

pub use options::{
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL, PollOptions,
};
pub use poller::{PollError, PollHandle, PollOutcome, Poller, poll_until_ready};
