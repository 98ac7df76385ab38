//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing
//! API. They serve as the boundary between HTTP and the application layer.

use serde::{Deserialize, Serialize};

use crate::application::handlers::subscription::{HistoryEntry, ReconcileOutcome};
use crate::domain::catalog::{PaymentMethod, Plan, PlanFeatures};
use crate::domain::subscription::SubscriptionRecord;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseRequest {
    /// Key of the plan to purchase.
    pub plan_key: String,
    /// Payment method key.
    pub payment_method: String,
    /// Reference for methods that require one (bank transfer, QR).
    #[serde(default)]
    pub external_reference: Option<String>,
    /// Email for checkout pre-fill.
    #[serde(default)]
    pub email: Option<String>,
}

/// Request to confirm a pending payment.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentRequest {
    /// Record to confirm.
    pub record_id: String,
    /// Reference to attach if the record has none.
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Request to cancel a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CancelRequest {
    /// Target record; defaults to the caller's active one.
    #[serde(default)]
    pub record_id: Option<String>,
    /// Whether to revoke access immediately.
    #[serde(default)]
    pub immediate: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// One plan in the public catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub key: String,
    pub name: String,
    /// Decimal string, e.g. "50.00".
    pub price: String,
    pub term_days: i64,
    pub features: PlanFeaturesResponse,
}

/// Feature flags of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanFeaturesResponse {
    /// Minutes per day, -1 for unlimited.
    pub daily_minutes: i32,
    pub voice_feedback: bool,
    pub angle_analysis: bool,
    /// Days of history retained, -1 for unlimited.
    pub history_days: i32,
    pub ads: bool,
    pub custom_routines: bool,
    pub priority_support: bool,
}

impl From<PlanFeatures> for PlanFeaturesResponse {
    fn from(f: PlanFeatures) -> Self {
        Self {
            daily_minutes: f.daily_minutes,
            voice_feedback: f.voice_feedback,
            angle_analysis: f.angle_analysis,
            history_days: f.history_days,
            ads: f.ads,
            custom_routines: f.custom_routines,
            priority_support: f.priority_support,
        }
    }
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            key: plan.key,
            name: plan.name,
            price: plan.price.to_string(),
            term_days: plan.term_days,
            features: PlanFeaturesResponse::from(plan.features),
        }
    }
}

/// One payment method in the public catalog.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethodResponse {
    pub key: String,
    pub name: String,
    pub requires_reference: bool,
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(method: PaymentMethod) -> Self {
        Self {
            key: method.key,
            name: method.name,
            requires_reference: method.requires_reference,
        }
    }
}

/// A subscription record as exposed over the API.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRecordResponse {
    pub id: String,
    pub plan_key: String,
    /// Display name; the raw key when the plan has been retired.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    /// Decimal string, e.g. "50.00".
    pub amount: String,
    pub payment_method: String,
    pub payment_state: String,
    pub active: bool,
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_reference: Option<String>,
    /// ISO 8601.
    pub started_at: String,
    /// ISO 8601.
    pub expires_at: String,
}

impl SubscriptionRecordResponse {
    pub fn from_record(record: SubscriptionRecord, plan_name: Option<String>) -> Self {
        Self {
            id: record.id.to_string(),
            plan_key: record.plan_key,
            plan_name,
            amount: record.amount.to_string(),
            payment_method: record.payment_method,
            payment_state: record.payment_state.as_str().to_string(),
            active: record.active,
            cancelled: record.cancelled,
            external_reference: record.external_reference,
            started_at: record.started_at.as_datetime().to_rfc3339(),
            expires_at: record.expires_at.as_datetime().to_rfc3339(),
        }
    }
}

impl From<HistoryEntry> for SubscriptionRecordResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self::from_record(entry.record, Some(entry.plan_name))
    }
}

/// Response for a started purchase.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseResponse {
    pub record: SubscriptionRecordResponse,
    /// Hosted checkout URL, present for gateway purchases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// Response for a confirmed payment.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmPaymentResponse {
    pub record: SubscriptionRecordResponse,
    pub was_duplicate: bool,
}

/// Response for a cancellation.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub record: SubscriptionRecordResponse,
    pub deactivated: bool,
}

/// Response for the history listing.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<SubscriptionRecordResponse>,
}

/// The caller's effective plan.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentPlanResponse {
    pub plan: PlanResponse,
    /// ISO 8601; absent on the default plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

/// Acknowledgement returned to the gateway for accepted deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// What reconciliation did: activated, deactivated, duplicate,
    /// orphan_created, or dropped.
    pub outcome: String,
}

impl WebhookAckResponse {
    pub fn from_outcome(outcome: &ReconcileOutcome) -> Self {
        let label = match outcome {
            ReconcileOutcome::Activated(_) => "activated",
            ReconcileOutcome::Deactivated(_) => "deactivated",
            ReconcileOutcome::Duplicate(_) => "duplicate",
            ReconcileOutcome::OrphanCreated(_) => "orphan_created",
            ReconcileOutcome::Dropped { .. } => "dropped",
        };
        Self {
            received: true,
            outcome: label.to_string(),
        }
    }
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Money, SubscriptionId, Timestamp, UserId};

    #[test]
    fn plan_response_formats_price_as_decimal() {
        let plan = Plan {
            key: "basico".to_string(),
            name: "Básico".to_string(),
            price: Money::from_cents(5000).unwrap(),
            term_days: 30,
            features: PlanFeatures::default(),
            display_order: 1,
            active: true,
        };

        let response = PlanResponse::from(plan);
        assert_eq!(response.price, "50.00");
    }

    #[test]
    fn record_response_carries_iso_timestamps() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let plan = Plan {
            key: "basico".to_string(),
            name: "Básico".to_string(),
            price: Money::from_cents(5000).unwrap(),
            term_days: 30,
            features: PlanFeatures::default(),
            display_order: 1,
            active: true,
        };
        let record = SubscriptionRecord::create_pending(
            SubscriptionId::new(),
            UserId::new("user-7").unwrap(),
            &plan,
            "transferencia",
            None,
            None,
            now,
        );

        let response = SubscriptionRecordResponse::from_record(record, Some("Básico".to_string()));

        assert_eq!(response.payment_state, "pending");
        assert!(response.started_at.starts_with("2023-11-14T"));
        assert_eq!(response.plan_name.as_deref(), Some("Básico"));
    }
}
