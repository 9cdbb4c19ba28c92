//! A consumer account and the session it is currently signed in with.
//!
//! Every call that needs session credentials goes through
//! [`AuthRetryingClient`], so an expired session is refreshed once and the
//! call replayed with the new credentials.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::auth_retry::{AuthRetryingClient, SessionRefresher};
use crate::consumer::{
    ConsumerApi, ConsumerSession, Credentials, DeletedPaymentDetails, NewPaymentDetails,
    PaymentDetails, PaymentDetailsUpdate, SignUpParams, VerificationKind,
};
use crate::error::ApiError;
use crate::polling::{PollError, PollHandle, PollOptions, Poller, poll_until_ready};

/// Where the account stands, derived from the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Verified,
    RequiresVerification,
    RequiresSignUp,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Verified => write!(f, "verified"),
            AccountStatus::RequiresVerification => write!(f, "requires verification"),
            AccountStatus::RequiresSignUp => write!(f, "requires sign up"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    session: Option<ConsumerSession>,
    /// Consumer-scoped key handed out with the session.
    publishable_key: Option<String>,
}

pub struct LinkAccount<A: ConsumerApi> {
    api: A,
    email: String,
    state: RwLock<SessionState>,
}

impl<A: ConsumerApi> LinkAccount<A> {
    pub fn new(api: A, email: &str) -> Self {
        Self {
            api,
            email: email.to_string(),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Resumes an account from a session obtained earlier.
    pub fn with_session(
        api: A,
        email: &str,
        session: ConsumerSession,
        publishable_key: Option<String>,
    ) -> Self {
        Self {
            api,
            email: email.to_string(),
            state: RwLock::new(SessionState {
                session: Some(session),
                publishable_key,
            }),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub async fn session(&self) -> Option<ConsumerSession> {
        self.state.read().await.session.clone()
    }

    pub async fn publishable_key(&self) -> Option<String> {
        self.state.read().await.publishable_key.clone()
    }

    pub async fn status(&self) -> AccountStatus {
        match &self.state.read().await.session {
            None => AccountStatus::RequiresSignUp,
            Some(session) if session.is_verified() => AccountStatus::Verified,
            Some(_) => AccountStatus::RequiresVerification,
        }
    }

    async fn credentials(&self) -> Result<Credentials, ApiError> {
        let state = self.state.read().await;
        let session = state.session.as_ref().ok_or(ApiError::NoSession)?;
        Ok(Credentials::new(
            &session.client_secret,
            state.publishable_key.as_deref(),
        ))
    }

    /// Replaces the session. The publishable key is kept if the response
    /// did not carry a new one.
    async fn store(&self, session: ConsumerSession, publishable_key: Option<String>) {
        let mut state = self.state.write().await;
        state.session = Some(session);
        if publishable_key.is_some() {
            state.publishable_key = publishable_key;
        }
    }

    async fn clear(&self) {
        *self.state.write().await = SessionState::default();
    }

    async fn update_session(&self, session: ConsumerSession) {
        self.state.write().await.session = Some(session);
    }

    /// Runs `call` with the current credentials, refreshing the session once
    /// if they turn out to be expired.
    async fn authenticated<T, F, Fut>(&self, operation_name: &str, call: F) -> Result<T, ApiError>
    where
        F: Fn(Credentials) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let call = &call;
        let this = self;
        AuthRetryingClient::new(self)
            .execute(operation_name, move || async move {
                // Re-read on every attempt so a replay picks up refreshed credentials.
                let credentials = this.credentials().await?;
                call(credentials).await
            })
            .await
    }

    /// Looks the account up by email and adopts the session it returns.
    #[tracing::instrument(skip(self), fields(email = %self.email))]
    pub async fn lookup(&self) -> Result<AccountStatus, ApiError> {
        let response = self
            .api
            .lookup(Some(self.email.clone()), &Credentials::default())
            .await?;

        match response.consumer_session {
            Some(session) if response.exists => {
                self.store(session, response.publishable_key).await;
            }
            _ => {
                if let Some(message) = response.error_message {
                    debug!("Lookup: {}", message);
                }
                self.clear().await;
            }
        }

        let status = self.status().await;
        info!("Account {} {}", self.email, status);
        Ok(status)
    }

    /// Re-validates the current session without any user input.
    ///
    /// Fails with [`ApiError::NoSession`] if there is nothing to refresh, and
    /// with [`ApiError::AuthenticationExpired`] if the server no longer knows
    /// the session (which is then dropped).
    #[tracing::instrument(skip(self), fields(email = %self.email))]
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let credentials = self.credentials().await?;
        let response = self.api.lookup(None, &credentials).await?;

        match response.consumer_session {
            Some(session) if response.exists => {
                self.store(session, response.publishable_key).await;
                debug!("Session refreshed");
                Ok(())
            }
            _ => {
                self.clear().await;
                Err(ApiError::AuthenticationExpired)
            }
        }
    }

    #[tracing::instrument(skip(self, phone_number), fields(email = %self.email))]
    pub async fn sign_up(
        &self,
        phone_number: &str,
        country: &str,
        legal_name: Option<&str>,
        locale: Option<&str>,
    ) -> Result<AccountStatus, ApiError> {
        let params = SignUpParams {
            email_address: self.email.clone(),
            phone_number: phone_number.to_string(),
            country: country.to_string(),
            legal_name: legal_name.map(str::to_string),
            locale: locale.map(str::to_string),
        };
        let response = self.api.sign_up(&params).await?;
        self.store(response.consumer_session, response.publishable_key)
            .await;
        Ok(self.status().await)
    }

    pub async fn start_verification(
        &self,
        kind: VerificationKind,
        locale: &str,
    ) -> Result<AccountStatus, ApiError> {
        let session = self
            .authenticated("Start verification", |credentials| async move {
                self.api
                    .start_verification(kind, locale, &credentials)
                    .await
            })
            .await?;
        self.update_session(session).await;
        Ok(self.status().await)
    }

    pub async fn confirm_verification(
        &self,
        kind: VerificationKind,
        code: &str,
    ) -> Result<AccountStatus, ApiError> {
        let session = self
            .authenticated("Confirm verification", |credentials| async move {
                self.api
                    .confirm_verification(kind, code, &credentials)
                    .await
            })
            .await?;
        self.update_session(session).await;
        Ok(self.status().await)
    }

    pub async fn list_payment_details(&self) -> Result<Vec<PaymentDetails>, ApiError> {
        self.authenticated("List payment details", |credentials| async move {
            self.api.list_payment_details(&credentials).await
        })
        .await
    }

    pub async fn create_payment_details(
        &self,
        details: &NewPaymentDetails,
    ) -> Result<PaymentDetails, ApiError> {
        self.authenticated("Create payment details", |credentials| async move {
            self.api.create_payment_details(details, &credentials).await
        })
        .await
    }

    pub async fn update_payment_details(
        &self,
        id: &str,
        update: &PaymentDetailsUpdate,
    ) -> Result<PaymentDetails, ApiError> {
        self.authenticated("Update payment details", |credentials| async move {
            self.api
                .update_payment_details(id, update, &credentials)
                .await
        })
        .await
    }

    pub async fn set_default_payment_details(&self, id: &str) -> Result<PaymentDetails, ApiError> {
        self.update_payment_details(
            id,
            &PaymentDetailsUpdate {
                is_default: Some(true),
            },
        )
        .await
    }

    pub async fn delete_payment_details(&self, id: &str) -> Result<DeletedPaymentDetails, ApiError> {
        self.authenticated("Delete payment details", |credentials| async move {
            self.api.delete_payment_details(id, &credentials).await
        })
        .await
    }

    async fn retrieve_payment_details(&self, id: &str) -> Result<PaymentDetails, ApiError> {
        self.authenticated("Retrieve payment details", |credentials| async move {
            self.api.retrieve_payment_details(id, &credentials).await
        })
        .await
    }

    /// Polls a payment method until the server finishes setting it up.
    #[tracing::instrument(skip(self, options, cancel))]
    pub async fn wait_for_payment_details(
        &self,
        id: &str,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PaymentDetails, PollError<ApiError>> {
        poll_until_ready(|| self.retrieve_payment_details(id), options, cancel).await
    }

    /// Signs out on the server if possible; the local session is dropped
    /// either way.
    #[tracing::instrument(skip(self), fields(email = %self.email))]
    pub async fn log_out(&self) -> Result<(), ApiError> {
        let credentials = match self.credentials().await {
            Ok(credentials) => credentials,
            Err(ApiError::NoSession) => return Ok(()),
            Err(e) => return Err(e),
        };

        if let Err(e) = self.api.log_out(&credentials).await {
            warn!("Server log out failed ({}), clearing local session anyway", e);
        }
        self.clear().await;
        Ok(())
    }
}

impl<A: ConsumerApi + 'static> LinkAccount<A> {
    /// Like [`wait_for_payment_details`](Self::wait_for_payment_details), but
    /// on a background task.
    pub fn spawn_wait_for_payment_details(
        self: &Arc<Self>,
        id: &str,
        options: PollOptions,
    ) -> PollHandle<PaymentDetails, ApiError> {
        let account = Arc::clone(self);
        let id = id.to_string();
        Poller::new(options).start(move || {
            let account = Arc::clone(&account);
            let id = id.clone();
            async move { account.retrieve_payment_details(&id).await }
        })
    }
}

#[async_trait]
impl<A: ConsumerApi> SessionRefresher for LinkAccount<A> {
    async fn refresh_session(&self) -> Result<(), ApiError> {
        LinkAccount::refresh_session(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::{
        LookupResponse, MockConsumerApi, PaymentDetailsKind, SessionResponse,
        VerificationSession, VerificationState,
    };
    use std::time::Duration;

    const EMAIL: &str = "jane@example.com";

    fn session(secret: &str, verified: bool) -> ConsumerSession {
        ConsumerSession {
            client_secret: secret.to_string(),
            email_address: EMAIL.to_string(),
            redacted_phone_number: None,
            verification_sessions: vec![VerificationSession {
                kind: VerificationKind::Sms,
                state: if verified {
                    VerificationState::Verified
                } else {
                    VerificationState::Started
                },
            }],
        }
    }

    fn found(secret: &str, key: &str) -> LookupResponse {
        LookupResponse {
            exists: true,
            consumer_session: Some(session(secret, true)),
            publishable_key: Some(key.to_string()),
            error_message: None,
        }
    }

    fn card(id: &str) -> PaymentDetails {
        PaymentDetails {
            id: id.to_string(),
            kind: PaymentDetailsKind::Card,
            is_default: false,
            last4: Some("4242".to_string()),
            brand: Some("visa".to_string()),
            bank_name: None,
        }
    }

    fn has_secret(credentials: &Credentials, secret: &str) -> bool {
        credentials.client_secret.as_deref() == Some(secret)
    }

    fn signed_in(api: MockConsumerApi) -> LinkAccount<MockConsumerApi> {
        LinkAccount::with_session(
            api,
            EMAIL,
            session("secret_1", true),
            Some("pk_1".to_string()),
        )
    }

    #[tokio::test]
    async fn test_lookup_adopts_session() {
        let mut api = MockConsumerApi::new();
        api.expect_lookup()
            .withf(|email, credentials| {
                email.as_deref() == Some(EMAIL) && credentials.client_secret.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(found("secret_1", "pk_1")));

        let account = LinkAccount::new(api, EMAIL);
        assert_eq!(account.status().await, AccountStatus::RequiresSignUp);

        let status = account.lookup().await.unwrap();

        assert_eq!(status, AccountStatus::Verified);
        assert_eq!(account.session().await.unwrap().client_secret, "secret_1");
        assert_eq!(account.publishable_key().await.as_deref(), Some("pk_1"));
    }

    #[tokio::test]
    async fn test_lookup_unknown_email_requires_sign_up() {
        let mut api = MockConsumerApi::new();
        api.expect_lookup().times(1).returning(|_, _| {
            Ok(LookupResponse {
                exists: false,
                consumer_session: None,
                publishable_key: None,
                error_message: Some("No such consumer".to_string()),
            })
        });

        let account = signed_in(api);
        let status = account.lookup().await.unwrap();

        assert_eq!(status, AccountStatus::RequiresSignUp);
        assert!(account.session().await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_session_fails() {
        let mut api = MockConsumerApi::new();
        api.expect_lookup().never();

        let account = LinkAccount::new(api, EMAIL);
        assert_eq!(account.refresh_session().await, Err(ApiError::NoSession));
    }

    #[tokio::test]
    async fn test_refresh_of_unknown_session_drops_it() {
        let mut api = MockConsumerApi::new();
        api.expect_lookup()
            .withf(|email, credentials| email.is_none() && has_secret(credentials, "secret_1"))
            .times(1)
            .returning(|_, _| {
                Ok(LookupResponse {
                    exists: false,
                    consumer_session: None,
                    publishable_key: None,
                    error_message: None,
                })
            });

        let account = signed_in(api);
        assert_eq!(
            account.refresh_session().await,
            Err(ApiError::AuthenticationExpired)
        );
        assert_eq!(account.status().await, AccountStatus::RequiresSignUp);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_and_replayed_with_new_credentials() {
        let mut api = MockConsumerApi::new();
        api.expect_list_payment_details()
            .withf(|credentials| has_secret(credentials, "secret_1"))
            .times(1)
            .returning(|_| Err(ApiError::AuthenticationExpired));
        api.expect_lookup()
            .withf(|email, credentials| {
                email.is_none()
                    && has_secret(credentials, "secret_1")
                    && credentials.publishable_key.as_deref() == Some("pk_1")
            })
            .times(1)
            .returning(|_, _| Ok(found("secret_2", "pk_2")));
        api.expect_list_payment_details()
            .withf(|credentials| {
                has_secret(credentials, "secret_2")
                    && credentials.publishable_key.as_deref() == Some("pk_2")
            })
            .times(1)
            .returning(|_| Ok(vec![card("pd_1")]));

        let account = signed_in(api);
        let details = account.list_payment_details().await.unwrap();

        assert_eq!(details, vec![card("pd_1")]);
        assert_eq!(account.session().await.unwrap().client_secret, "secret_2");
        assert_eq!(account.publishable_key().await.as_deref(), Some("pk_2"));
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_original_error() {
        let mut api = MockConsumerApi::new();
        api.expect_delete_payment_details()
            .times(1)
            .returning(|_, _| Err(ApiError::AuthenticationExpired));
        api.expect_lookup()
            .times(1)
            .returning(|_, _| Err(ApiError::Network("connection reset".to_string())));

        let account = signed_in(api);
        let result = account.delete_payment_details("pd_1").await;

        assert_eq!(result, Err(ApiError::AuthenticationExpired));
    }

    #[tokio::test]
    async fn test_terminal_error_does_not_refresh() {
        let mut api = MockConsumerApi::new();
        api.expect_update_payment_details()
            .withf(|id, update, _| id == "pd_1" && update.is_default == Some(true))
            .times(1)
            .returning(|_, _, _| {
                Err(ApiError::Api {
                    status: 404,
                    code: Some("resource_missing".to_string()),
                    message: "No such payment details".to_string(),
                })
            });
        api.expect_lookup().never();

        let account = signed_in(api);
        let result = account.set_default_payment_details("pd_1").await;

        assert!(matches!(result, Err(ApiError::Api { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_authenticated_call_without_session() {
        let mut api = MockConsumerApi::new();
        api.expect_list_payment_details().never();
        api.expect_lookup().never();

        let account = LinkAccount::new(api, EMAIL);
        assert_eq!(
            account.list_payment_details().await,
            Err(ApiError::NoSession)
        );
    }

    #[tokio::test]
    async fn test_sign_up_stores_session() {
        let mut api = MockConsumerApi::new();
        api.expect_sign_up()
            .withf(|params| params.email_address == EMAIL && params.country == "US")
            .times(1)
            .returning(|_| {
                Ok(SessionResponse {
                    consumer_session: session("secret_new", false),
                    publishable_key: Some("pk_new".to_string()),
                })
            });

        let account = LinkAccount::new(api, EMAIL);
        let status = account
            .sign_up("+15555555555", "US", Some("Jane Doe"), None)
            .await
            .unwrap();

        assert_eq!(status, AccountStatus::RequiresVerification);
        assert_eq!(account.publishable_key().await.as_deref(), Some("pk_new"));
    }

    #[tokio::test]
    async fn test_confirm_verification_updates_status() {
        let mut api = MockConsumerApi::new();
        api.expect_confirm_verification()
            .withf(|kind, code, credentials| {
                *kind == VerificationKind::Sms
                    && code == "000000"
                    && has_secret(credentials, "secret_1")
            })
            .times(1)
            .returning(|_, _, _| Ok(session("secret_1", true)));

        let account = LinkAccount::with_session(api, EMAIL, session("secret_1", false), None);
        assert_eq!(account.status().await, AccountStatus::RequiresVerification);

        let status = account
            .confirm_verification(VerificationKind::Sms, "000000")
            .await
            .unwrap();

        assert_eq!(status, AccountStatus::Verified);
    }

    #[tokio::test]
    async fn test_start_verification_uses_session() {
        let mut api = MockConsumerApi::new();
        api.expect_start_verification()
            .withf(|kind, locale, credentials| {
                *kind == VerificationKind::Email
                    && locale == "en-US"
                    && has_secret(credentials, "secret_1")
            })
            .times(1)
            .returning(|_, _, _| Ok(session("secret_1", false)));

        let account = LinkAccount::with_session(api, EMAIL, session("secret_1", false), None);
        let status = account
            .start_verification(VerificationKind::Email, "en-US")
            .await
            .unwrap();

        assert_eq!(status, AccountStatus::RequiresVerification);
    }

    #[tokio::test]
    async fn test_create_payment_details_replays_after_refresh() {
        let mut api = MockConsumerApi::new();
        api.expect_create_payment_details()
            .withf(|_, credentials| has_secret(credentials, "secret_1"))
            .times(1)
            .returning(|_, _| Err(ApiError::AuthenticationExpired));
        api.expect_lookup()
            .times(1)
            .returning(|_, _| Ok(found("secret_2", "pk_2")));
        api.expect_create_payment_details()
            .withf(|details, credentials| {
                matches!(details, NewPaymentDetails::Card { .. })
                    && has_secret(credentials, "secret_2")
            })
            .times(1)
            .returning(|_, _| Ok(card("pd_new")));

        let account = signed_in(api);
        let details = account
            .create_payment_details(&NewPaymentDetails::Card {
                card: crate::consumer::CardParams {
                    number: "4242424242424242".to_string(),
                    exp_month: 12,
                    exp_year: 2030,
                    cvc: Some("123".to_string()),
                },
                billing_email_address: None,
            })
            .await
            .unwrap();

        assert_eq!(details.id, "pd_new");
    }

    #[tokio::test]
    async fn test_log_out_clears_session_even_on_failure() {
        let mut api = MockConsumerApi::new();
        api.expect_log_out()
            .times(1)
            .returning(|_| Err(ApiError::Network("timeout".to_string())));

        let account = signed_in(api);
        account.log_out().await.unwrap();

        assert_eq!(account.status().await, AccountStatus::RequiresSignUp);
        assert!(account.publishable_key().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_payment_details_polls_until_ready() {
        let mut api = MockConsumerApi::new();
        let mut calls = 0;
        api.expect_retrieve_payment_details()
            .withf(|id, _| id == "pd_1")
            .times(3)
            .returning(move |_, _| {
                calls += 1;
                if calls < 3 {
                    Err(ApiError::Processing { status: 202 })
                } else {
                    Ok(card("pd_1"))
                }
            });

        let account = signed_in(api);
        let options = PollOptions {
            initial_delay: Duration::from_millis(100),
            max_retries: 5,
            retry_interval: Duration::from_millis(10),
        };
        let details = account
            .wait_for_payment_details("pd_1", &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(details.id, "pd_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_refreshes_session_mid_poll() {
        let mut api = MockConsumerApi::new();
        api.expect_retrieve_payment_details()
            .withf(|_, credentials| has_secret(credentials, "secret_1"))
            .times(1)
            .returning(|_, _| Err(ApiError::AuthenticationExpired));
        api.expect_lookup()
            .times(1)
            .returning(|_, _| Ok(found("secret_2", "pk_2")));
        let mut calls = 0;
        api.expect_retrieve_payment_details()
            .withf(|_, credentials| has_secret(credentials, "secret_2"))
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Err(ApiError::Processing { status: 202 })
                } else {
                    Ok(card("pd_1"))
                }
            });

        let account = signed_in(api);
        let options = PollOptions {
            initial_delay: Duration::from_millis(100),
            max_retries: 5,
            retry_interval: Duration::from_millis(10),
        };
        let details = account
            .wait_for_payment_details("pd_1", &options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(details.id, "pd_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_wait_exhausts_retries() {
        let mut api = MockConsumerApi::new();
        api.expect_retrieve_payment_details()
            .times(3)
            .returning(|_, _| Err(ApiError::Processing { status: 202 }));

        let account = Arc::new(signed_in(api));
        let handle = account.spawn_wait_for_payment_details(
            "pd_1",
            PollOptions {
                initial_delay: Duration::from_millis(100),
                max_retries: 2,
                retry_interval: Duration::from_millis(10),
            },
        );

        assert_eq!(
            handle.wait().await,
            Err(PollError::RetriesExhausted {
                attempts: 3,
                last: ApiError::Processing { status: 202 },
            })
        );
    }
}
