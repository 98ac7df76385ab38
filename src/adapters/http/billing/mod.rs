//! HTTP adapter for billing endpoints.
//!
//! Exposes the subscription domain via REST API:
//! - `GET /api/billing/plans` - List purchasable plans
//! - `GET /api/billing/payment-methods` - List accepted payment methods
//! - `GET /api/billing/me` - Get the caller's effective plan
//! - `GET /api/billing/history` - List the caller's subscription records
//! - `POST /api/billing/purchase` - Start a purchase
//! - `POST /api/billing/confirm` - Confirm a pending payment
//! - `POST /api/billing/cancel` - Cancel a subscription
//! - `POST /api/webhooks/payment` - Reconcile gateway events

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedUser, BillingApiError, BillingAppState};
pub use routes::{billing_router, billing_routes, webhook_routes};
