//! HistoryHandler - Query handler for a user's subscription history.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::{PlanCatalog, SubscriptionLedger};

/// Query for a user's full subscription history.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub user_id: UserId,
}

/// One history entry: the record plus its resolved plan name.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub record: SubscriptionRecord,

    /// Display name of the plan. Falls back to the raw key when the plan
    /// has since been removed from the catalog.
    pub plan_name: String,
}

/// Result of a history query, newest first.
#[derive(Debug, Clone)]
pub struct HistoryResult {
    pub entries: Vec<HistoryEntry>,
}

/// Handler for listing a user's subscription history.
pub struct HistoryHandler {
    catalog: Arc<dyn PlanCatalog>,
    ledger: Arc<dyn SubscriptionLedger>,
}

impl HistoryHandler {
    pub fn new(catalog: Arc<dyn PlanCatalog>, ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub async fn handle(&self, query: HistoryQuery) -> Result<HistoryResult, SubscriptionError> {
        let records = self.ledger.history_for_user(&query.user_id).await?;

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let plan_name = match self.catalog.plan(&record.plan_key).await? {
                Some(plan) => plan.name,
                None => record.plan_key.clone(),
            };
            entries.push(HistoryEntry { record, plan_name });
        }

        Ok(HistoryResult { entries })
    }
}
