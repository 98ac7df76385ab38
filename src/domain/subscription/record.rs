//! SubscriptionRecord aggregate.
//!
//! The core ledger entry. Records are append-only: lifecycle operations
//! flip `payment_state`, `active`, and `cancelled`, never delete.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Plan;
use crate::domain::foundation::{Money, StateMachine, SubscriptionId, Timestamp, UserId};

use super::errors::SubscriptionError;
use super::payment_state::PaymentState;

/// Outcome of a confirmation attempt.
///
/// Confirmation is idempotent: confirming an already-confirmed record is a
/// no-op that returns the record unchanged, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// The record transitioned pending -> confirmed/active.
    Confirmed(SubscriptionRecord),

    /// The record was already confirmed; nothing was applied.
    AlreadyConfirmed(SubscriptionRecord),
}

impl ConfirmOutcome {
    /// The record after the attempt.
    pub fn record(&self) -> &SubscriptionRecord {
        match self {
            ConfirmOutcome::Confirmed(r) | ConfirmOutcome::AlreadyConfirmed(r) => r,
        }
    }

    /// Consumes the outcome, returning the record.
    pub fn into_record(self) -> SubscriptionRecord {
        match self {
            ConfirmOutcome::Confirmed(r) | ConfirmOutcome::AlreadyConfirmed(r) => r,
        }
    }

    /// True when the attempt was a duplicate no-op.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ConfirmOutcome::AlreadyConfirmed(_))
    }
}

/// A single subscription purchase and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Opaque record id, assigned at creation.
    pub id: SubscriptionId,

    /// Owning user.
    pub user_id: UserId,

    /// Key of the purchased plan. The plan itself may later be removed
    /// from the catalog; the key is kept for the audit trail.
    pub plan_key: String,

    /// Amount charged for this term.
    pub amount: Money,

    /// Payment method key ("stripe", "manual", ...).
    pub payment_method: String,

    /// Correlation reference with the external processor. Set at creation
    /// or on confirmation; once set it is the idempotency key for
    /// gateway events.
    pub external_reference: Option<String>,

    /// Settlement state.
    pub payment_state: PaymentState,

    /// True only while this record confers the user's current plan.
    pub active: bool,

    /// True once a cancellation has been recorded, independent of `active`.
    pub cancelled: bool,

    /// Term start, immutable.
    pub started_at: Timestamp,

    /// Term end, fixed at creation. Never retroactively shortened.
    pub expires_at: Timestamp,

    /// Audit timestamps.
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Creates a pending record for a purchase.
    ///
    /// The record is inactive until confirmation. Multiple pending records
    /// may coexist for a user; only one may ever become active.
    pub fn create_pending(
        id: SubscriptionId,
        user_id: UserId,
        plan: &Plan,
        payment_method: impl Into<String>,
        external_reference: Option<String>,
        term_days_override: Option<i64>,
        now: Timestamp,
    ) -> Self {
        let term_days = term_days_override.unwrap_or(plan.term_days);
        Self {
            id,
            user_id,
            plan_key: plan.key.clone(),
            amount: plan.price,
            payment_method: payment_method.into(),
            external_reference,
            payment_state: PaymentState::Pending,
            active: false,
            cancelled: false,
            started_at: now,
            expires_at: now.add_days(term_days),
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a record directly in confirmed/active state.
    ///
    /// Used for orphan recovery: a successful-payment event with no
    /// matching pending record still produces a ledger entry rather than
    /// dropping the revenue event.
    pub fn create_confirmed(
        id: SubscriptionId,
        user_id: UserId,
        plan_key: impl Into<String>,
        amount: Money,
        payment_method: impl Into<String>,
        external_reference: Option<String>,
        term_days: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            plan_key: plan_key.into(),
            amount,
            payment_method: payment_method.into(),
            external_reference,
            payment_state: PaymentState::Confirmed,
            active: true,
            cancelled: false,
            started_at: now,
            expires_at: now.add_days(term_days),
            created_at: now,
            updated_at: now,
        }
    }

    /// Confirms the payment and activates the record.
    ///
    /// Idempotent compare-and-set on `payment_state`: an already-confirmed
    /// record is returned unchanged. A rejected or refunded record cannot
    /// be confirmed.
    ///
    /// The caller (ledger) is responsible for deactivating the user's other
    /// active records in the same atomic step.
    pub fn confirm(
        &mut self,
        external_reference: Option<&str>,
        now: Timestamp,
    ) -> Result<ConfirmOutcome, SubscriptionError> {
        if self.payment_state == PaymentState::Confirmed {
            return Ok(ConfirmOutcome::AlreadyConfirmed(self.clone()));
        }

        self.payment_state = self
            .payment_state
            .transition_to(PaymentState::Confirmed)
            .map_err(|_| {
                SubscriptionError::invalid_state(self.payment_state.as_str(), "confirm")
            })?;
        self.active = true;
        if self.external_reference.is_none() {
            if let Some(reference) = external_reference {
                self.external_reference = Some(reference.to_string());
            }
        }
        self.updated_at = now;

        Ok(ConfirmOutcome::Confirmed(self.clone()))
    }

    /// Marks the payment as rejected by the gateway or an operator.
    pub fn reject(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        self.payment_state = self
            .payment_state
            .transition_to(PaymentState::Rejected)
            .map_err(|_| {
                SubscriptionError::invalid_state(self.payment_state.as_str(), "reject")
            })?;
        self.active = false;
        self.updated_at = now;
        Ok(())
    }

    /// Marks a settled payment as refunded.
    pub fn mark_refunded(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        self.payment_state = self
            .payment_state
            .transition_to(PaymentState::Refunded)
            .map_err(|_| {
                SubscriptionError::invalid_state(self.payment_state.as_str(), "refund")
            })?;
        self.updated_at = now;
        Ok(())
    }

    /// Clears the active flag. Idempotent; returns true if it changed.
    pub fn deactivate(&mut self, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.updated_at = now;
        true
    }

    /// Records a cancellation request. Idempotent.
    pub fn mark_cancelled(&mut self, now: Timestamp) {
        if !self.cancelled {
            self.cancelled = true;
            self.updated_at = now;
        }
    }

    /// Attaches an external reference if none is set yet.
    ///
    /// The reference is the idempotency key towards the gateway; once set
    /// it is never overwritten.
    pub fn attach_reference(&mut self, reference: impl Into<String>, now: Timestamp) {
        if self.external_reference.is_none() {
            self.external_reference = Some(reference.into());
            self.updated_at = now;
        }
    }

    /// True if the record is active but its term has elapsed.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.active && !self.expires_at.is_after(&now)
    }
}
