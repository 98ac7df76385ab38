//! Stripe payment gateway adapter.
//!
//! Implements the `PaymentGateway` port for Stripe, including:
//! - Hosted checkout sessions
//! - Webhook signature verification and event decoding
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod stripe_gateway;
mod wire_types;

pub use stripe_gateway::{StripeConfig, StripeGateway};
pub use wire_types::{StripeCheckoutSession, StripeSubscription, StripeWebhookEvent};
