//! Plan catalog port (read side).
//!
//! Defines the contract for serving the commercial catalog: plans and
//! payment methods. The catalog is read-only from the engine's point of
//! view; plan management happens out of band.
//!
//! # Design
//!
//! - **Key-addressed**: Plans and methods are looked up by stable string key
//! - **Lenient lookups**: `plan()` resolves inactive plans too, so history
//!   rendering and reconciliation keep working after a plan is retired
//! - **Stable ordering**: Listings sort by display order, then key

use crate::domain::catalog::{PaymentMethod, Plan};
use crate::domain::foundation::DomainError;
use async_trait::async_trait;

/// Port serving plans and payment methods.
///
/// Implementations must ensure:
/// - Plan keys are unique
/// - Listing order is deterministic (display order, then key)
/// - The default plan key always resolves to an existing plan
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// List all active plans, sorted by display order then key.
    async fn list_active_plans(&self) -> Result<Vec<Plan>, DomainError>;

    /// Find a plan by key, including inactive plans.
    ///
    /// Returns `None` if no plan carries this key at all. Callers that
    /// require an active plan must check `plan.active` themselves.
    async fn plan(&self, key: &str) -> Result<Option<Plan>, DomainError>;

    /// List all active payment methods, sorted by display order then key.
    async fn list_active_payment_methods(&self) -> Result<Vec<PaymentMethod>, DomainError>;

    /// Find a payment method by key, including inactive ones.
    async fn payment_method(&self, key: &str) -> Result<Option<PaymentMethod>, DomainError>;

    /// Key of the plan users fall back to without an active subscription.
    fn default_plan_key(&self) -> &str;
}
