//! ConfirmPaymentHandler - Command handler for operator payment confirmation.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::SubscriptionLedger;

/// Command to confirm a payment on a pending record.
///
/// Used by operators for manual methods (bank transfer, QR) after checking
/// the money arrived. Gateway payments confirm through the webhook instead.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    /// Caller on whose behalf the confirmation runs.
    pub user_id: UserId,
    pub record_id: SubscriptionId,
    /// Reference to attach if the record has none yet.
    pub external_reference: Option<String>,
}

/// Result of a confirmation attempt.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentResult {
    pub record: SubscriptionRecord,
    /// True when the record was already confirmed and nothing changed.
    pub was_duplicate: bool,
}

/// Handler for confirming a pending payment.
pub struct ConfirmPaymentHandler {
    ledger: Arc<dyn SubscriptionLedger>,
}

impl ConfirmPaymentHandler {
    pub fn new(ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ConfirmPaymentResult, SubscriptionError> {
        // 1. The record must exist and belong to the caller
        let record = self
            .ledger
            .find_by_id(&cmd.record_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(cmd.record_id))?;

        if record.user_id != cmd.user_id {
            return Err(SubscriptionError::unauthorized(cmd.record_id));
        }

        // 2. Confirm and activate atomically; idempotent on redelivery
        let outcome = self
            .ledger
            .confirm_and_activate(&cmd.record_id, cmd.external_reference.as_deref(), Timestamp::now())
            .await?;

        let was_duplicate = outcome.is_duplicate();
        let record = outcome.into_record();

        info!(
            record_id = %record.id,
            user_id = %record.user_id,
            plan = %record.plan_key,
            duplicate = was_duplicate,
            "Payment confirmed"
        );

        Ok(ConfirmPaymentResult {
            record,
            was_duplicate,
        })
    }
}
