use std::time::Duration;

/// Delay before the first attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1750);

/// Number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 180;

/// Delay between a processing response and the next attempt.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Timing and retry budget for a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub initial_delay: Duration,
    /// `0` means a single attempt.
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl PollOptions {
    /// Upper bound on how long a poll can run, ignoring time spent inside
    /// the operation itself. Saturates at [`Duration::MAX`].
    pub fn max_wait(&self) -> Duration {
        self.retry_interval
            .checked_mul(self.max_retries)
            .and_then(|retries| retries.checked_add(self.initial_delay))
            .unwrap_or(Duration::MAX)
    }
}
