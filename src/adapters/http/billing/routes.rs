//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for billing-related API endpoints
//! and wires them to their corresponding handlers.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel, confirm_payment, get_current_plan, get_history, handle_payment_webhook, list_plans,
    list_payment_methods, purchase, BillingAppState,
};

/// Create the billing API router.
///
/// # Routes
///
/// ## Catalog Endpoints (public)
/// - `GET /plans` - List purchasable plans
/// - `GET /payment-methods` - List accepted payment methods
///
/// ## User Endpoints (require authentication)
/// - `GET /me` - Get the caller's effective plan
/// - `GET /history` - List the caller's subscription records
/// - `POST /purchase` - Start a purchase
/// - `POST /confirm` - Confirm a pending payment
/// - `POST /cancel` - Cancel a subscription
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /webhooks/payment` - Reconcile gateway events
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        // Catalog endpoints
        .route("/plans", get(list_plans))
        .route("/payment-methods", get(list_payment_methods))
        // User endpoints
        .route("/me", get(get_current_plan))
        .route("/history", get(get_history))
        .route("/purchase", post(purchase))
        .route("/confirm", post(confirm_payment))
        .route("/cancel", post(cancel))
}

/// Create the payment webhook router.
///
/// This is separate from the main billing routes because webhooks
/// don't require user authentication (they're verified via signature).
///
/// # Routes
/// - `POST /payment` - Reconcile gateway events
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/payment", post(handle_payment_webhook))
}

/// Create the complete billing module router.
///
/// Combines user routes and webhook routes into a single router
/// suitable for mounting at `/api/billing` and `/api/webhooks`.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::billing::{billing_router, BillingAppState};
///
/// let app_state = BillingAppState { /* ... */ };
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/billing", billing_routes())
        .nest("/webhooks", webhook_routes())
}
