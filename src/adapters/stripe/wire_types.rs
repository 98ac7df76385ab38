//! Raw Stripe wire types.
//!
//! Serde structs matching the shapes Stripe sends, plus the mapping into
//! the provider-neutral `GatewayEvent`. Nothing outside this adapter sees
//! these types.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::foundation::{Money, SubscriptionId, UserId};
use crate::domain::subscription::{GatewayEvent, GatewayEventKind};
use crate::ports::GatewayError;

/// Top-level Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub created: i64,

    #[serde(default)]
    pub livemode: bool,

    pub data: StripeEventData,
}

/// The `data` wrapper around the event object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Checkout session object, the payload of `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,

    #[serde(default)]
    pub payment_status: Option<String>,

    /// Total in the currency's minor unit (cents).
    #[serde(default)]
    pub amount_total: Option<i64>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription object, the payload of `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeWebhookEvent {
    /// Decodes the raw event into the provider-neutral shape.
    ///
    /// Metadata set at checkout creation (`record_id`, `user_id`, `plan`)
    /// travels back here and drives reconciliation matching.
    pub fn into_gateway_event(self) -> Result<GatewayEvent, GatewayError> {
        let kind = match self.event_type.as_str() {
            "checkout.session.completed" => GatewayEventKind::PaymentSucceeded,
            "customer.subscription.updated" => GatewayEventKind::SubscriptionUpdated,
            "customer.subscription.deleted" => GatewayEventKind::SubscriptionRemoved,
            "charge.refunded" => GatewayEventKind::SubscriptionRemoved,
            other => GatewayEventKind::Unknown(other.to_string()),
        };

        let (correlation_ref, metadata, amount, payment_status) = match kind {
            GatewayEventKind::PaymentSucceeded => {
                let session: StripeCheckoutSession = serde_json::from_value(self.data.object)
                    .map_err(|e| {
                        GatewayError::invalid_event(format!("Invalid checkout session: {}", e))
                    })?;
                (
                    Some(session.id),
                    session.metadata,
                    session.amount_total,
                    session.payment_status,
                )
            }
            GatewayEventKind::SubscriptionUpdated | GatewayEventKind::SubscriptionRemoved => {
                // Refund deliveries reuse the checkout session shape; try the
                // subscription object first, fall back to the session
                match serde_json::from_value::<StripeSubscription>(self.data.object.clone()) {
                    Ok(sub) => (Some(sub.id), sub.metadata, None, sub.status),
                    Err(_) => {
                        let session: StripeCheckoutSession =
                            serde_json::from_value(self.data.object).map_err(|e| {
                                GatewayError::invalid_event(format!("Invalid event object: {}", e))
                            })?;
                        (
                            Some(session.id),
                            session.metadata,
                            session.amount_total,
                            session.payment_status,
                        )
                    }
                }
            }
            _ => (None, HashMap::new(), None, None),
        };

        let record_id = metadata
            .get("record_id")
            .and_then(|s| s.parse::<SubscriptionId>().ok());
        let user_id = metadata
            .get("user_id")
            .and_then(|s| UserId::new(s.clone()).ok());
        let plan_key = metadata.get("plan").cloned();
        let amount = amount.and_then(|cents| Money::from_cents(cents).ok());

        Ok(GatewayEvent {
            id: self.id,
            kind,
            correlation_ref,
            record_id,
            user_id,
            plan_key,
            amount,
            payment_status,
            created: self.created,
        })
    }
}
