//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the Stripe API: hosted
//! checkout session creation and webhook verification.
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, warn};

use crate::domain::subscription::{GatewayEvent, GatewayEventVerifier};
use crate::ports::{CheckoutSession, CreateCheckoutRequest, GatewayError, PaymentGateway};

use super::wire_types::StripeWebhookEvent;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Redirect after a completed checkout.
    success_url: String,

    /// Redirect after an abandoned checkout.
    cancel_url: String,

    /// Whether to reject test mode events.
    require_livemode: bool,
}

impl StripeConfig {
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: impl Into<String>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Reject test mode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe implementation of the `PaymentGateway` port.
pub struct StripeGateway {
    config: StripeConfig,
    verifier: GatewayEventVerifier,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Self {
        let verifier = GatewayEventVerifier::new(config.webhook_secret.expose_secret());
        Self {
            config,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn method_key(&self) -> &'static str {
        "stripe"
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let mut params = vec![
            ("mode", "payment".to_string()),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                "usd".to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount.cents().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.plan_name.clone(),
            ),
            // Metadata drives webhook matching back to the ledger
            ("metadata[record_id]", request.record_id.to_string()),
            ("metadata[user_id]", request.user_id.to_string()),
            ("metadata[plan]", request.plan_key.clone()),
            ("metadata[term_days]", request.term_days.to_string()),
        ];

        if let Some(email) = &request.email {
            params.push(("customer_email", email.clone()));
        }

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::authentication("Stripe rejected the API key"));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Stripe checkout creation failed");
            return Err(
                GatewayError::provider(format!("Stripe API error: {}", error_text))
                    .with_provider_code(status.as_str().to_string()),
            );
        }

        #[derive(serde::Deserialize)]
        struct SessionResponse {
            id: String,
            url: String,
        }

        let session: SessionResponse = response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn verify_event(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<GatewayEvent, GatewayError> {
        self.verifier.verify(payload, signature).map_err(|e| {
            warn!(error = %e, "Webhook signature verification failed");
            GatewayError::invalid_event(e.to_string())
        })?;

        let raw: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "Failed to parse webhook payload");
            GatewayError::invalid_event(format!("Invalid JSON: {}", e))
        })?;

        if self.config.require_livemode && !raw.livemode {
            warn!(event_id = %raw.id, "Rejected test mode event in production");
            return Err(GatewayError::invalid_event(
                "Test mode events not allowed in production",
            ));
        }

        raw.into_gateway_event()
    }
}
