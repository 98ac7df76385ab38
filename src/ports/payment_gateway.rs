//! Payment gateway port for external payment processing.
//!
//! Defines the contract for the hosted-checkout gateway integration.
//! Implementations handle checkout session creation and the verification
//! and decoding of inbound webhook deliveries.
//!
//! # Design
//!
//! - **Gateway agnostic**: Interface works with any hosted-checkout provider
//! - **Verify-then-decode**: Webhook payloads are only decoded after the
//!   signature check passes
//! - **Idempotent**: Checkout creation can be safely retried for the same
//!   pending record

use crate::domain::foundation::{DomainError, Money, SubscriptionId, UserId};
use crate::domain::subscription::GatewayEvent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for payment gateway integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Payment method key this gateway settles (e.g. `"stripe"`).
    ///
    /// Purchases through other methods never touch the gateway.
    fn method_key(&self) -> &'static str;

    /// Create a hosted checkout session for a pending record.
    ///
    /// The record id travels in session metadata so the confirmation
    /// event can be matched back without relying on the session id.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Verify a webhook delivery and decode it.
    ///
    /// Returns the decoded event if the signature is authentic, an
    /// `InvalidEvent` error otherwise.
    async fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, GatewayError>;
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Internal user id (stored as session metadata).
    pub user_id: UserId,

    /// Customer email for pre-fill.
    pub email: Option<String>,

    /// Key of the plan being purchased.
    pub plan_key: String,

    /// Display name shown on the checkout page.
    pub plan_name: String,

    /// Amount to charge.
    pub amount: Money,

    /// Term length in days, carried in metadata for orphan recovery.
    pub term_days: i64,

    /// Pending ledger record this session settles.
    pub record_id: SubscriptionId,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session id.
    pub id: String,

    /// URL for the customer to complete checkout.
    pub url: String,
}

/// Errors from gateway operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl GatewayError {
    /// Create a new gateway error.
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the provider's error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::AuthenticationError, message)
    }

    /// Create an invalid event error (bad signature or undecodable body).
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::InvalidEvent, message)
    }

    /// Create a provider-side error.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            GatewayErrorCode::InvalidEvent => ErrorCode::AuthenticityCheckFailed,
            _ => ErrorCode::GatewayUnavailable,
        };

        DomainError::new(code, err.message)
    }
}

/// Gateway error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// API authentication failed.
    AuthenticationError,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Webhook signature invalid or body undecodable.
    InvalidEvent,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::InvalidEvent => "invalid_event",
            GatewayErrorCode::ProviderError => "provider_error",
            GatewayErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
