//! Subscription ledger port (write side).
//!
//! Defines the contract for persisting subscription records and the
//! per-user current-plan projection. The ledger is append-only: records
//! are never deleted, only transitioned and deactivated.
//!
//! # Design
//!
//! - **Append-only**: Every purchase attempt leaves a record
//! - **Atomic activation**: `confirm_and_activate` performs the state
//!   transition, the deactivation of other active records for the same
//!   user, and the projection update as one atomic step
//! - **Single active record**: At most one active record per user at any
//!   point, enforced by the activation and sweep operations

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{ConfirmOutcome, SubscriptionRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A user's effective plan, derived from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlan {
    /// Key of the plan currently in effect.
    pub plan_key: String,

    /// Expiration of the backing record, absent on the default plan.
    pub expires_at: Option<Timestamp>,

    /// Backing active record, absent on the default plan.
    pub record_id: Option<SubscriptionId>,
}

/// Port for subscription record persistence.
///
/// Implementations must ensure:
/// - `confirm_and_activate` is atomic and idempotent on redelivery
/// - Deactivating a record reverts the user's projection to the default plan
/// - Listings are ordered newest first
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Append a new pending record.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Find a record by its id. Returns `None` if not found.
    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Find a record by its gateway correlation reference.
    ///
    /// References are unique across the ledger once attached.
    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// List a user's pending records, newest first.
    async fn pending_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Find the user's active record, if any.
    async fn active_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// List every record a user has ever held, newest first.
    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    /// Attach a gateway correlation reference to a record.
    ///
    /// Set-once: fails with `ValidationFailed` if the record already
    /// carries a different reference.
    async fn attach_external_reference(
        &self,
        id: &SubscriptionId,
        reference: &str,
        now: Timestamp,
    ) -> Result<(), DomainError>;

    /// Confirm a pending record and make it the user's single active one.
    ///
    /// Atomically, in one step:
    /// 1. Transition the record from pending to confirmed
    /// 2. Deactivate any other active record the user holds
    /// 3. Point the user's plan projection at this record
    ///
    /// Idempotent: confirming an already-confirmed record returns
    /// `ConfirmOutcome::AlreadyConfirmed` without changing anything.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `InvalidStateTransition` if the record is rejected or refunded
    async fn confirm_and_activate(
        &self,
        id: &SubscriptionId,
        external_reference: Option<&str>,
        now: Timestamp,
    ) -> Result<ConfirmOutcome, DomainError>;

    /// Insert an already-confirmed record and activate it atomically.
    ///
    /// Used for orphan recovery, where a verified gateway event has no
    /// matching pending record. Performs the same deactivation and
    /// projection steps as `confirm_and_activate`.
    async fn insert_confirmed(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Mark a settled record as refunded and deactivate it.
    ///
    /// Reverts the user's projection. Returns the updated record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    /// - `InvalidStateTransition` unless the record is confirmed
    async fn mark_refunded(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Record a cancellation without deactivating.
    ///
    /// The record stays active until its term elapses; the sweeper then
    /// deactivates it. Idempotent. Returns the updated record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    async fn mark_cancelled(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Deactivate a record and revert the user's projection.
    ///
    /// When `mark_cancelled` is true the record is also flagged as
    /// user-cancelled. Returns the updated record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record doesn't exist
    async fn deactivate(
        &self,
        id: &SubscriptionId,
        mark_cancelled: bool,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError>;

    /// Deactivate every active record whose expiration has passed.
    ///
    /// Reverts affected users to the default plan. Returns the number of
    /// records deactivated. Safe to run concurrently with activations:
    /// a record confirmed after the sweep reads its candidates is not
    /// touched.
    async fn sweep_expired(&self, now: Timestamp) -> Result<u64, DomainError>;

    /// Resolve the user's effective plan from the projection.
    ///
    /// Falls back to the default plan when no active record exists.
    async fn current_plan(&self, user_id: &UserId) -> Result<UserPlan, DomainError>;
}
