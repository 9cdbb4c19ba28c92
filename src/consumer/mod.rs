//! Consumer account API.
//!
//! [`ConsumerApi`] is the seam between [`LinkAccount`](crate::account::LinkAccount)
//! and the network; [`HttpConsumerApi`] is the real implementation.

mod client;
mod types;

use async_trait::async_trait;

use crate::error::ApiError;

pub use client::HttpConsumerApi;
pub use types::{
    BankAccountParams, CardParams, ConsumerSession, Credentials, CredentialsBody,
    DeletedPaymentDetails, LookupResponse, NewPaymentDetails, PaymentDetails, PaymentDetailsKind,
    PaymentDetailsList, PaymentDetailsUpdate, SessionResponse, SignUpParams, VerificationKind,
    VerificationSession, VerificationState,
};

/// Operations on consumer accounts and their saved payment methods.
///
/// Methods taking [`Credentials`] fail with
/// [`ApiError::AuthenticationExpired`] once the session client secret is no
/// longer valid.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumerApi: Send + Sync {
    /// Looks up an account by email, or re-validates the session in
    /// `credentials` when `email` is `None`.
    async fn lookup(
        &self,
        email: Option<String>,
        credentials: &Credentials,
    ) -> Result<LookupResponse, ApiError>;

    async fn sign_up(&self, params: &SignUpParams) -> Result<SessionResponse, ApiError>;

    async fn start_verification(
        &self,
        kind: VerificationKind,
        locale: &str,
        credentials: &Credentials,
    ) -> Result<ConsumerSession, ApiError>;

    async fn confirm_verification(
        &self,
        kind: VerificationKind,
        code: &str,
        credentials: &Credentials,
    ) -> Result<ConsumerSession, ApiError>;

    async fn list_payment_details(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PaymentDetails>, ApiError>;

    async fn create_payment_details(
        &self,
        details: &NewPaymentDetails,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError>;

    async fn update_payment_details(
        &self,
        id: &str,
        update: &PaymentDetailsUpdate,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError>;

    async fn delete_payment_details(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<DeletedPaymentDetails, ApiError>;

    /// Fetches a payment method; fails with [`ApiError::Processing`] while it
    /// is still being set up.
    async fn retrieve_payment_details(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError>;

    async fn log_out(&self, credentials: &Credentials) -> Result<ConsumerSession, ApiError>;
}
