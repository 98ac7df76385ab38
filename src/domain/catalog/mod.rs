//! Catalog module - Plan and payment method reference data.
//!
//! The catalog is read-only from the billing engine's perspective; it is
//! edited out of band and consumed through the `PlanCatalog` port.

mod payment_method;
mod plan;

pub use payment_method::PaymentMethod;
pub use plan::{Plan, PlanFeatures};
