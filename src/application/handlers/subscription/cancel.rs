//! CancelHandler - Command handler for subscription cancellation.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::SubscriptionLedger;

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelCommand {
    pub user_id: UserId,

    /// Target record. Defaults to the caller's active record.
    pub record_id: Option<SubscriptionId>,

    /// Immediate cancellations deactivate now and revert the plan;
    /// deferred ones keep access until the paid term ends.
    pub immediate: bool,
}

/// Result of a cancellation.
#[derive(Debug, Clone)]
pub struct CancelResult {
    pub record: SubscriptionRecord,
    /// True when access was revoked right away.
    pub deactivated: bool,
}

/// Handler for cancelling the caller's active subscription.
///
/// Only the active record can be cancelled: pending records are settled or
/// rejected through the payment flow, and inactive ones have nothing left
/// to cancel.
pub struct CancelHandler {
    ledger: Arc<dyn SubscriptionLedger>,
}

impl CancelHandler {
    pub fn new(ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(&self, cmd: CancelCommand) -> Result<CancelResult, SubscriptionError> {
        // 1. Resolve the target record
        let record = match cmd.record_id {
            Some(id) => {
                let record = self
                    .ledger
                    .find_by_id(&id)
                    .await?
                    .ok_or_else(|| SubscriptionError::not_found(id))?;
                if record.user_id != cmd.user_id {
                    return Err(SubscriptionError::unauthorized(id));
                }
                record
            }
            None => self
                .ledger
                .active_for_user(&cmd.user_id)
                .await?
                .ok_or_else(|| SubscriptionError::no_active_subscription(cmd.user_id.clone()))?,
        };

        // 2. Only the active record is cancellable
        if !record.active {
            return Err(SubscriptionError::no_active_subscription(cmd.user_id));
        }

        // 3. Apply the chosen mode
        let now = Timestamp::now();
        let (record, deactivated) = if cmd.immediate {
            (self.ledger.deactivate(&record.id, true, now).await?, true)
        } else {
            (self.ledger.mark_cancelled(&record.id, now).await?, false)
        };

        info!(
            record_id = %record.id,
            user_id = %record.user_id,
            immediate = cmd.immediate,
            "Subscription cancelled"
        );

        Ok(CancelResult {
            record,
            deactivated,
        })
    }
}
