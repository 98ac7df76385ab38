//! CurrentPlanHandler - Query handler for a user's effective plan.

use std::sync::Arc;

use crate::domain::catalog::Plan;
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::SubscriptionError;
use crate::ports::{PlanCatalog, SubscriptionLedger};

/// Query for the plan currently in effect for a user.
#[derive(Debug, Clone)]
pub struct CurrentPlanQuery {
    pub user_id: UserId,
}

/// The user's effective plan with its feature set.
#[derive(Debug, Clone)]
pub struct CurrentPlanResult {
    pub plan: Plan,

    /// Expiration of the backing record, absent on the default plan.
    pub expires_at: Option<Timestamp>,

    /// Backing active record, absent on the default plan.
    pub record_id: Option<SubscriptionId>,
}

/// Handler resolving the caller's effective plan.
///
/// Reads the ledger projection and joins the plan from the catalog, so
/// feature gates always see a complete plan even for users who never
/// purchased anything.
pub struct CurrentPlanHandler {
    catalog: Arc<dyn PlanCatalog>,
    ledger: Arc<dyn SubscriptionLedger>,
}

impl CurrentPlanHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub async fn handle(
        &self,
        query: CurrentPlanQuery,
    ) -> Result<CurrentPlanResult, SubscriptionError> {
        let user_plan = self.ledger.current_plan(&query.user_id).await?;

        // The projected key may belong to a retired plan; fall back to the
        // default plan rather than failing the lookup.
        let plan = match self.catalog.plan(&user_plan.plan_key).await? {
            Some(plan) => plan,
            None => self
                .catalog
                .plan(self.catalog.default_plan_key())
                .await?
                .ok_or_else(|| {
                    SubscriptionError::infrastructure("Default plan missing from catalog")
                })?,
        };

        Ok(CurrentPlanResult {
            plan,
            expires_at: user_plan.expires_at,
            record_id: user_plan.record_id,
        })
    }
}
