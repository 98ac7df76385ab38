//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `PlanCatalog` - Read-side catalog of plans and payment methods
//! - `SubscriptionLedger` - Append-only subscription record persistence
//! - `PaymentGateway` - Hosted-checkout provider integration

mod payment_gateway;
mod plan_catalog;
mod subscription_ledger;

pub use payment_gateway::{
    CheckoutSession, CreateCheckoutRequest, GatewayError, GatewayErrorCode, PaymentGateway,
};
pub use plan_catalog::PlanCatalog;
pub use subscription_ledger::{SubscriptionLedger, UserPlan};
