//! Refresh-and-replay for calls that fail with expired session credentials.

use async_trait::async_trait;
use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;

use crate::error::{ApiError, Classify};

/// Re-establishes session credentials without new input from the user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    async fn refresh_session(&self) -> Result<(), ApiError>;
}

/// Runs `call`, and if it fails with an authentication error, runs `refresh`
/// and then `call` exactly once more.
///
/// A failed refresh is logged and the original error is returned instead. The
/// replay's result is returned as-is, even if it is another authentication
/// error.
pub async fn retry_on_auth_error<T, E, F, Fut, R, RFut, RE>(
    operation_name: &str,
    mut call: F,
    refresh: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + Display,
    R: FnOnce() -> RFut,
    RFut: Future<Output = Result<(), RE>>,
    RE: Display,
{
    let error = match call().await {
        Ok(value) => return Ok(value),
        Err(e) if e.is_authentication_expired() => e,
        Err(e) => return Err(e),
    };

    debug!("{}: {}, refreshing session", operation_name, error);

    if let Err(refresh_error) = refresh().await {
        warn!(
            "{}: session refresh failed ({}), returning original error",
            operation_name, refresh_error
        );
        return Err(error);
    }

    debug!("{}: session refreshed, replaying", operation_name);
    call().await
}

/// Wraps calls in [`retry_on_auth_error`] using a [`SessionRefresher`].
pub struct AuthRetryingClient<'a, R: SessionRefresher + ?Sized> {
    refresher: &'a R,
}

impl<'a, R: SessionRefresher + ?Sized> AuthRetryingClient<'a, R> {
    pub fn new(refresher: &'a R) -> Self {
        Self { refresher }
    }

    #[tracing::instrument(skip(self, call))]
    pub async fn execute<T, E, F, Fut>(&self, operation_name: &str, call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        retry_on_auth_error(operation_name, call, || self.refresher.refresh_session()).await
    }
}
