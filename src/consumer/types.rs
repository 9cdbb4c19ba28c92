//! Wire types for the consumer API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A consumer session as returned by lookup, sign-up and verification calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerSession {
    pub client_secret: String,
    pub email_address: String,
    #[serde(default)]
    pub redacted_phone_number: Option<String>,
    #[serde(default)]
    pub verification_sessions: Vec<VerificationSession>,
}

impl ConsumerSession {
    pub fn is_verified(&self) -> bool {
        self.verification_sessions
            .iter()
            .any(|s| s.state == VerificationState::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSession {
    #[serde(rename = "type")]
    pub kind: VerificationKind,
    pub state: VerificationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationKind {
    #[default]
    Sms,
    Email,
}

impl fmt::Display for VerificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationKind::Sms => write!(f, "sms"),
            VerificationKind::Email => write!(f, "email"),
        }
    }
}

impl FromStr for VerificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sms" => Ok(VerificationKind::Sms),
            "email" => Ok(VerificationKind::Email),
            _ => anyhow::bail!("Unknown verification type: {}. Expected sms or email.", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    Started,
    Failed,
    Verified,
    Canceled,
    Expired,
}

/// Session credentials sent with authenticated requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub client_secret: Option<String>,
    /// Overrides the client's configured key when set.
    pub publishable_key: Option<String>,
}

impl Credentials {
    pub fn new(client_secret: &str, publishable_key: Option<&str>) -> Self {
        Self {
            client_secret: Some(client_secret.to_string()),
            publishable_key: publishable_key.map(str::to_string),
        }
    }

    /// The `credentials` object of a request body.
    pub fn body(&self) -> Option<CredentialsBody<'_>> {
        self.client_secret
            .as_deref()
            .map(|consumer_session_client_secret| CredentialsBody {
                consumer_session_client_secret,
            })
    }
}

#[derive(Debug, Serialize)]
pub struct CredentialsBody<'a> {
    pub consumer_session_client_secret: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LookupResponse {
    pub exists: bool,
    #[serde(default)]
    pub consumer_session: Option<ConsumerSession>,
    #[serde(default)]
    pub publishable_key: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionResponse {
    pub consumer_session: ConsumerSession,
    #[serde(default)]
    pub publishable_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignUpParams {
    pub email_address: String,
    pub phone_number: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDetailsKind {
    Card,
    BankAccount,
}

impl fmt::Display for PaymentDetailsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentDetailsKind::Card => write!(f, "card"),
            PaymentDetailsKind::BankAccount => write!(f, "bank_account"),
        }
    }
}

/// A saved payment method. Card and bank details arrive redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PaymentDetailsKind,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub last4: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
}

impl fmt::Display for PaymentDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self
            .brand
            .as_deref()
            .or(self.bank_name.as_deref())
            .unwrap_or("unknown");
        write!(
            f,
            "{} {} {} ****{}",
            self.id,
            self.kind,
            label,
            self.last4.as_deref().unwrap_or("????")
        )?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentDetailsList {
    pub redacted_payment_details: Vec<PaymentDetails>,
}

/// Payload for saving a new payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewPaymentDetails {
    Card {
        card: CardParams,
        #[serde(skip_serializing_if = "Option::is_none")]
        billing_email_address: Option<String>,
    },
    BankAccount {
        bank_account: BankAccountParams,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardParams {
    pub number: String,
    pub exp_month: u8,
    pub exp_year: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankAccountParams {
    /// Id of the linked account from the bank connection flow.
    pub account: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentDetailsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedPaymentDetails {
    pub id: String,
    #[serde(default)]
    pub deleted: bool,
}
