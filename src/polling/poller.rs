use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::options::PollOptions;
use crate::error::Classify;

/// Why a poll ended without a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError<E> {
    /// The operation failed with an error that is not worth retrying.
    #[error("{0}")]
    Failed(E),

    /// The server kept reporting "processing" past the retry budget.
    #[error("still processing after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: E },

    #[error("polling was cancelled")]
    Cancelled,
}

impl<E> PollError<E> {
    /// The underlying operation error, if the poll ended with one.
    pub fn api_error(&self) -> Option<&E> {
        match self {
            PollError::Failed(e) | PollError::RetriesExhausted { last: e, .. } => Some(e),
            PollError::Cancelled => None,
        }
    }
}

/// Runs the poll loop on the current task.
///
/// The operation is never invoked concurrently with itself: each attempt is
/// awaited before the next delay starts.
#[tracing::instrument(skip(operation, cancel))]
pub async fn poll_until_ready<T, E, F, Fut>(
    mut operation: F,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
{
    let mut remaining = options.max_retries;
    let mut delay = options.initial_delay;
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Poll cancelled after {} attempt(s)", attempts);
                return Err(PollError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        attempts = attempts.saturating_add(1);
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Poll cancelled during attempt {}", attempts);
                return Err(PollError::Cancelled);
            }
            result = operation() => result,
        };

        match result {
            Ok(value) => {
                debug!("Poll succeeded on attempt {}", attempts);
                return Ok(value);
            }
            Err(e) if e.is_processing() => {
                if remaining == 0 {
                    warn!("Still processing after {} attempts, giving up", attempts);
                    return Err(PollError::RetriesExhausted { attempts, last: e });
                }
                remaining -= 1;
                delay = options.retry_interval;
                debug!(
                    "Attempt {} still processing, {} retries left, next in {:?}",
                    attempts, remaining, delay
                );
            }
            Err(e) => {
                debug!("Attempt {} failed: {}", attempts, e);
                return Err(PollError::Failed(e));
            }
        }
    }
}

/// Starts polls on background tasks.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    options: PollOptions,
}

impl Poller {
    pub fn new(options: PollOptions) -> Self {
        Self { options }
    }

    /// Spawns the poll loop and returns a handle to its outcome.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// handle cancels the poll; keep a [`PollOutcome`] from
    /// [`PollHandle::subscribe`] to observe that.
    pub fn start<T, E, F, Fut>(&self, operation: F) -> PollHandle<T, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Clone + Send + Sync + 'static,
        E: Classify + Display + Clone + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        let options = self.options;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let outcome = poll_until_ready(operation, &options, &token).await;
            // Receivers may all be gone; the value is kept either way.
            tx.send_replace(Some(outcome));
        });

        PollHandle {
            outcome: PollOutcome { rx },
            _guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }
}

/// Owns a running poll.
pub struct PollHandle<T, E> {
    outcome: PollOutcome<T, E>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: JoinHandle<()>,
}

impl<T: Clone, E: Clone> PollHandle<T, E> {
    /// Stops the poll. Observers receive [`PollError::Cancelled`] unless the
    /// poll already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this poll, for wiring into other shutdown paths.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Another observer of the same outcome.
    pub fn subscribe(&self) -> PollOutcome<T, E> {
        self.outcome.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the poll to finish.
    pub async fn wait(self) -> Result<T, PollError<E>> {
        self.outcome.clone().wait().await
    }
}

/// Read side of a poll's outcome. Every clone sees the same terminal value,
/// including clones taken after the poll finished.
pub struct PollOutcome<T, E> {
    rx: watch::Receiver<Option<Result<T, PollError<E>>>>,
}

impl<T, E> Clone for PollOutcome<T, E> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Clone, E: Clone> PollOutcome<T, E> {
    /// The outcome if the poll has already finished.
    pub fn get(&self) -> Option<Result<T, PollError<E>>> {
        self.rx.borrow().clone()
    }

    pub async fn wait(mut self) -> Result<T, PollError<E>> {
        let outcome = match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            // The poll task died without publishing (panic or runtime shutdown).
            Err(_) => None,
        };
        outcome.unwrap_or(Err(PollError::Cancelled))
    }
}
