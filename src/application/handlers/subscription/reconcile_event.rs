//! ReconcileEventHandler - Command handler for inbound gateway events.
//!
//! The reconciliation engine: verifies a webhook delivery, matches it to a
//! ledger record, and applies exactly one state change. Redeliveries and
//! unmatchable events resolve to explicit outcomes instead of errors so
//! the gateway always gets a 2xx and stops retrying.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{ErrorCode, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    GatewayEvent, GatewayEventKind, SubscriptionError, SubscriptionRecord,
};
use crate::ports::{GatewayErrorCode, PaymentGateway, PlanCatalog, SubscriptionLedger};

/// Command carrying a raw webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileEventCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

/// What the reconciliation did with the event.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// A pending record was confirmed and activated.
    Activated(SubscriptionRecord),

    /// An active record was deactivated (removal or refund).
    Deactivated(SubscriptionRecord),

    /// The event was already applied; nothing changed.
    Duplicate(SubscriptionRecord),

    /// No matching record existed; a confirmed one was created.
    OrphanCreated(SubscriptionRecord),

    /// The event could not be applied and was intentionally ignored.
    Dropped { reason: String },
}

/// Result of a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileEventResult {
    pub event_id: String,
    pub outcome: ReconcileOutcome,
}

/// Handler reconciling gateway events against the ledger.
pub struct ReconcileEventHandler {
    catalog: Arc<dyn PlanCatalog>,
    ledger: Arc<dyn SubscriptionLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReconcileEventHandler {
    pub fn new(
        catalog: Arc<dyn PlanCatalog>,
        ledger: Arc<dyn SubscriptionLedger>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileEventCommand,
    ) -> Result<ReconcileEventResult, SubscriptionError> {
        // 1. Authenticity first; nothing unverified reaches the ledger
        let event = self
            .gateway
            .verify_event(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| match e.code {
                GatewayErrorCode::InvalidEvent => SubscriptionError::authenticity_check_failed(),
                _ => SubscriptionError::infrastructure(e.message),
            })?;

        let event_id = event.id.clone();

        // 2. Dispatch on event kind
        let outcome = match &event.kind {
            GatewayEventKind::PaymentSucceeded => self.apply_payment_succeeded(&event).await?,
            GatewayEventKind::SubscriptionRemoved => self.apply_removal(&event).await?,
            GatewayEventKind::SubscriptionUpdated if event.is_refund() || event.is_lapsed() => {
                self.apply_removal(&event).await?
            }
            GatewayEventKind::SubscriptionUpdated => ReconcileOutcome::Dropped {
                reason: "Subscription update carries no actionable change".to_string(),
            },
            GatewayEventKind::Unknown(kind) => ReconcileOutcome::Dropped {
                reason: format!("Unhandled event kind '{}'", kind),
            },
        };

        match &outcome {
            ReconcileOutcome::Dropped { reason } => {
                warn!(event_id = %event_id, reason = %reason, "Event dropped")
            }
            _ => info!(event_id = %event_id, outcome = %outcome_label(&outcome), "Event reconciled"),
        }

        Ok(ReconcileEventResult { event_id, outcome })
    }

    /// Confirmation path: match a record, then confirm it idempotently.
    async fn apply_payment_succeeded(
        &self,
        event: &GatewayEvent,
    ) -> Result<ReconcileOutcome, SubscriptionError> {
        let now = Timestamp::now();

        let matched = self.match_record(event).await?;
        let record = match matched {
            Some(record) => record,
            None => return self.recover_orphan(event, now).await,
        };

        let result = self
            .ledger
            .confirm_and_activate(&record.id, event.correlation_ref.as_deref(), now)
            .await;

        match result {
            Ok(outcome) if outcome.is_duplicate() => {
                Ok(ReconcileOutcome::Duplicate(outcome.into_record()))
            }
            Ok(outcome) => Ok(ReconcileOutcome::Activated(outcome.into_record())),
            // A settled-terminal record cannot re-activate; swallow rather
            // than bounce the delivery back for retry
            Err(e) if e.code == ErrorCode::InvalidStateTransition => {
                Ok(ReconcileOutcome::Dropped {
                    reason: format!("Record {} is in terminal state", record.id),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removal path: deactivate, or mark refunded when the money went back.
    async fn apply_removal(
        &self,
        event: &GatewayEvent,
    ) -> Result<ReconcileOutcome, SubscriptionError> {
        let now = Timestamp::now();

        let record = match self.match_record(event).await? {
            Some(record) => record,
            None => {
                return Ok(ReconcileOutcome::Dropped {
                    reason: "Removal event matches no record".to_string(),
                })
            }
        };

        // A pending record must stay confirmable; removal before payment
        // settles is noise, not a deactivation
        if !record.payment_state.is_settled() && !record.active {
            return Ok(ReconcileOutcome::Dropped {
                reason: format!("Record {} has not settled yet", record.id),
            });
        }

        if !record.active {
            return Ok(ReconcileOutcome::Duplicate(record));
        }

        let updated = if event.is_refund() {
            self.ledger.mark_refunded(&record.id, now).await?
        } else {
            self.ledger.deactivate(&record.id, false, now).await?
        };

        Ok(ReconcileOutcome::Deactivated(updated))
    }

    /// Matching chain: record id from metadata, then correlation reference,
    /// then the newest pending record with the same plan and amount.
    async fn match_record(
        &self,
        event: &GatewayEvent,
    ) -> Result<Option<SubscriptionRecord>, SubscriptionError> {
        if let Some(id) = &event.record_id {
            if let Some(record) = self.ledger.find_by_id(id).await? {
                return Ok(Some(record));
            }
        }

        if let Some(reference) = &event.correlation_ref {
            if let Some(record) = self.ledger.find_by_external_reference(reference).await? {
                return Ok(Some(record));
            }
        }

        if let (Some(user_id), Some(plan_key), Some(amount)) =
            (&event.user_id, &event.plan_key, &event.amount)
        {
            let pending = self.ledger.pending_for_user(user_id).await?;
            let matched = pending
                .into_iter()
                .find(|r| r.plan_key == *plan_key && r.amount == *amount);
            return Ok(matched);
        }

        Ok(None)
    }

    /// A verified payment with no record still represents revenue; create
    /// the confirmed record instead of losing it.
    async fn recover_orphan(
        &self,
        event: &GatewayEvent,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, SubscriptionError> {
        let (user_id, plan_key) = match (&event.user_id, &event.plan_key) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                return Ok(ReconcileOutcome::Dropped {
                    reason: "Orphan event lacks user or plan metadata".to_string(),
                })
            }
        };

        let plan = match self.catalog.plan(&plan_key).await? {
            Some(plan) => plan,
            None => {
                return Ok(ReconcileOutcome::Dropped {
                    reason: format!("Orphan event names unknown plan '{}'", plan_key),
                })
            }
        };

        let record = SubscriptionRecord::create_confirmed(
            SubscriptionId::new(),
            user_id,
            plan.key.clone(),
            event.amount.unwrap_or(plan.price),
            self.gateway.method_key(),
            event.correlation_ref.clone(),
            plan.term_days,
            now,
        );
        self.ledger.insert_confirmed(&record).await?;

        warn!(
            record_id = %record.id,
            user_id = %record.user_id,
            plan = %record.plan_key,
            "Orphan payment recovered into a new record"
        );

        Ok(ReconcileOutcome::OrphanCreated(record))
    }
}

fn outcome_label(outcome: &ReconcileOutcome) -> &'static str {
    match outcome {
        ReconcileOutcome::Activated(_) => "activated",
        ReconcileOutcome::Deactivated(_) => "deactivated",
        ReconcileOutcome::Duplicate(_) => "duplicate",
        ReconcileOutcome::OrphanCreated(_) => "orphan_created",
        ReconcileOutcome::Dropped { .. } => "dropped",
    }
}
