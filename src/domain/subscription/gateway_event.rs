//! Decoded gateway confirmation event.
//!
//! The gateway adapter verifies and decodes raw webhook deliveries into
//! this provider-neutral shape before the reconciliation engine sees them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, SubscriptionId, UserId};

/// Kind of gateway event, mapped from the provider's event type string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayEventKind {
    /// Checkout or payment completed successfully.
    PaymentSucceeded,

    /// Remote subscription changed (status, period).
    SubscriptionUpdated,

    /// Remote subscription removed or payment revoked.
    SubscriptionRemoved,

    /// Event type the engine does not handle.
    Unknown(String),
}

/// A verified, decoded event from the payment gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Provider's event id (delivery-level, repeats on redelivery).
    pub id: String,

    /// Event kind.
    pub kind: GatewayEventKind,

    /// Correlation reference (checkout session or remote subscription id).
    pub correlation_ref: Option<String>,

    /// Ledger record id embedded in event metadata at checkout creation.
    pub record_id: Option<SubscriptionId>,

    /// Owning user, when carried in metadata.
    pub user_id: Option<UserId>,

    /// Plan key, when carried in metadata.
    pub plan_key: Option<String>,

    /// Amount paid, when carried by the event.
    pub amount: Option<Money>,

    /// Provider's payment status string ("paid", "refunded", ...).
    pub payment_status: Option<String>,

    /// Provider creation time (Unix seconds).
    pub created: i64,
}

impl GatewayEvent {
    /// True when the provider reports the payment as refunded.
    pub fn is_refund(&self) -> bool {
        self.payment_status.as_deref() == Some("refunded")
    }

    /// True when the provider reports the remote subscription as no longer
    /// collectible ("canceled" or "past_due" status).
    pub fn is_lapsed(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("canceled") | Some("past_due")
        )
    }
}
