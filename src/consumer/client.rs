//! Consumer API over HTTP.

use async_trait::async_trait;
use log::debug;

use super::{
    ConsumerApi, ConsumerSession, Credentials, DeletedPaymentDetails, LookupResponse,
    NewPaymentDetails, PaymentDetails, PaymentDetailsList, PaymentDetailsUpdate, SessionResponse,
    SignUpParams, VerificationKind,
};
use crate::error::ApiError;
use crate::http::HttpClient;

/// Request bodies (internal).
mod api {
    use serde::Serialize;

    use crate::consumer::{CredentialsBody, NewPaymentDetails, PaymentDetailsUpdate};

    #[derive(Serialize, Debug)]
    pub struct Lookup<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub email_address: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub credentials: Option<CredentialsBody<'a>>,
    }

    #[derive(Serialize, Debug)]
    pub struct Authenticated<'a> {
        pub credentials: Option<CredentialsBody<'a>>,
    }

    #[derive(Serialize, Debug)]
    pub struct StartVerification<'a> {
        pub credentials: Option<CredentialsBody<'a>>,
        #[serde(rename = "type")]
        pub kind: &'a str,
        pub locale: &'a str,
    }

    #[derive(Serialize, Debug)]
    pub struct ConfirmVerification<'a> {
        pub credentials: Option<CredentialsBody<'a>>,
        #[serde(rename = "type")]
        pub kind: &'a str,
        pub code: &'a str,
    }

    #[derive(Serialize, Debug)]
    pub struct CreatePaymentDetails<'a> {
        pub credentials: Option<CredentialsBody<'a>>,
        #[serde(flatten)]
        pub details: &'a NewPaymentDetails,
    }

    #[derive(Serialize, Debug)]
    pub struct UpdatePaymentDetails<'a> {
        pub credentials: Option<CredentialsBody<'a>>,
        #[serde(flatten)]
        pub update: &'a PaymentDetailsUpdate,
    }
}

/// [`ConsumerApi`] backed by [`HttpClient`].
pub struct HttpConsumerApi {
    http_client: HttpClient,
}

impl HttpConsumerApi {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    fn authenticated(credentials: &Credentials) -> api::Authenticated<'_> {
        api::Authenticated {
            credentials: credentials.body(),
        }
    }
}

#[async_trait]
impl ConsumerApi for HttpConsumerApi {
    #[tracing::instrument(skip(self, credentials))]
    async fn lookup(
        &self,
        email: Option<String>,
        credentials: &Credentials,
    ) -> Result<LookupResponse, ApiError> {
        // A lookup by email starts a new session, so the old secret is not sent.
        let body = api::Lookup {
            email_address: email.as_deref(),
            credentials: match email {
                Some(_) => None,
                None => credentials.body(),
            },
        };
        let response: LookupResponse = self
            .http_client
            .post_json(
                "/v1/consumers/sessions/lookup",
                &body,
                credentials.publishable_key.as_deref(),
            )
            .await?;
        debug!("Lookup: exists={}", response.exists);
        Ok(response)
    }

    #[tracing::instrument(skip(self, params))]
    async fn sign_up(&self, params: &SignUpParams) -> Result<SessionResponse, ApiError> {
        self.http_client
            .post_json("/v1/consumers/accounts/sign_up", params, None)
            .await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn start_verification(
        &self,
        kind: VerificationKind,
        locale: &str,
        credentials: &Credentials,
    ) -> Result<ConsumerSession, ApiError> {
        let kind = kind.to_string();
        let body = api::StartVerification {
            credentials: credentials.body(),
            kind: &kind,
            locale,
        };
        self.http_client
            .post_json(
                "/v1/consumers/sessions/start_verification",
                &body,
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, code, credentials))]
    async fn confirm_verification(
        &self,
        kind: VerificationKind,
        code: &str,
        credentials: &Credentials,
    ) -> Result<ConsumerSession, ApiError> {
        let kind = kind.to_string();
        let body = api::ConfirmVerification {
            credentials: credentials.body(),
            kind: &kind,
            code,
        };
        self.http_client
            .post_json(
                "/v1/consumers/sessions/confirm_verification",
                &body,
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn list_payment_details(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PaymentDetails>, ApiError> {
        let list: PaymentDetailsList = self
            .http_client
            .post_json(
                "/v1/consumers/payment_details/list",
                &Self::authenticated(credentials),
                credentials.publishable_key.as_deref(),
            )
            .await?;
        Ok(list.redacted_payment_details)
    }

    #[tracing::instrument(skip(self, details, credentials))]
    async fn create_payment_details(
        &self,
        details: &NewPaymentDetails,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError> {
        let body = api::CreatePaymentDetails {
            credentials: credentials.body(),
            details,
        };
        self.http_client
            .post_json(
                "/v1/consumers/payment_details",
                &body,
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, update, credentials))]
    async fn update_payment_details(
        &self,
        id: &str,
        update: &PaymentDetailsUpdate,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError> {
        let body = api::UpdatePaymentDetails {
            credentials: credentials.body(),
            update,
        };
        self.http_client
            .post_json(
                &format!("/v1/consumers/payment_details/{}", id),
                &body,
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn delete_payment_details(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<DeletedPaymentDetails, ApiError> {
        self.http_client
            .delete_json(
                &format!("/v1/consumers/payment_details/{}", id),
                &Self::authenticated(credentials),
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn retrieve_payment_details(
        &self,
        id: &str,
        credentials: &Credentials,
    ) -> Result<PaymentDetails, ApiError> {
        self.http_client
            .post_json(
                &format!("/v1/consumers/payment_details/{}/retrieve", id),
                &Self::authenticated(credentials),
                credentials.publishable_key.as_deref(),
            )
            .await
    }

    #[tracing::instrument(skip(self, credentials))]
    async fn log_out(&self, credentials: &Credentials) -> Result<ConsumerSession, ApiError> {
        self.http_client
            .post_json(
                "/v1/consumers/sessions/log_out",
                &Self::authenticated(credentials),
                credentials.publishable_key.as_deref(),
            )
            .await
    }
}
