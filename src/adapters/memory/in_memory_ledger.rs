//! In-memory implementation of SubscriptionLedger.
//!
//! Backs tests and local development. All multi-step operations run under
//! a single write lock, which gives the same atomicity the PostgreSQL
//! adapter gets from transactions.
//!
//! Supports error injection for exercising infrastructure failure paths
//! in handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{ConfirmOutcome, PaymentState, SubscriptionRecord};
use crate::ports::{SubscriptionLedger, UserPlan};

#[derive(Default)]
struct LedgerState {
    /// Records in insertion order; listings iterate in reverse.
    records: Vec<SubscriptionRecord>,

    /// Per-user projection: id of the single active record.
    current: HashMap<String, SubscriptionId>,
}

/// In-memory subscription ledger.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    default_plan_key: String,
    fail_writes: AtomicBool,
}

impl InMemoryLedger {
    pub fn new(default_plan_key: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            default_plan_key: default_plan_key.into(),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// When set, every write operation fails with `DatabaseError`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated write failure",
            ));
        }
        Ok(())
    }
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
}

impl LedgerState {
    fn find_mut(&mut self, id: &SubscriptionId) -> Option<&mut SubscriptionRecord> {
        self.records.iter_mut().find(|r| r.id == *id)
    }

    /// Deactivates every active record of `user_id` except `keep`.
    fn deactivate_others(&mut self, user_id: &UserId, keep: &SubscriptionId, now: Timestamp) {
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.user_id == *user_id && r.id != *keep && r.active)
        {
            record.deactivate(now);
        }
    }
}

#[async_trait]
impl SubscriptionLedger for InMemoryLedger {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state.records.push(record.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state.records.iter().find(|r| r.id == *id).cloned())
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .find(|r| r.external_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn pending_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.user_id == *user_id && r.payment_state == PaymentState::Pending)
            .cloned()
            .collect())
    }

    async fn active_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .rev()
            .find(|r| r.user_id == *user_id && r.active)
            .cloned())
    }

    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| r.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn attach_external_reference(
        &self,
        id: &SubscriptionId,
        reference: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let record = state.find_mut(id).ok_or_else(|| not_found(id))?;

        match record.external_reference.as_deref() {
            Some(existing) if existing != reference => Err(DomainError::validation(
                "external_reference",
                "Record already carries a different reference",
            )),
            Some(_) => Ok(()),
            None => {
                record.attach_reference(reference, now);
                Ok(())
            }
        }
    }

    async fn confirm_and_activate(
        &self,
        id: &SubscriptionId,
        external_reference: Option<&str>,
        now: Timestamp,
    ) -> Result<ConfirmOutcome, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let record = state.find_mut(id).ok_or_else(|| not_found(id))?;
        let user_id = record.user_id.clone();
        let outcome = record.confirm(external_reference, now).map_err(DomainError::from)?;

        if let ConfirmOutcome::Confirmed(_) = outcome {
            state.deactivate_others(&user_id, id, now);
            state.current.insert(user_id.as_str().to_string(), *id);
        }

        Ok(outcome)
    }

    async fn insert_confirmed(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        state.deactivate_others(&record.user_id, &record.id, Timestamp::now());
        state
            .current
            .insert(record.user_id.as_str().to_string(), record.id);
        state.records.push(record.clone());
        Ok(())
    }

    async fn mark_refunded(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let record = state.find_mut(id).ok_or_else(|| not_found(id))?;
        record.mark_refunded(now).map_err(DomainError::from)?;
        record.deactivate(now);
        let updated = record.clone();

        let user_key = updated.user_id.as_str().to_string();
        if state.current.get(&user_key) == Some(id) {
            state.current.remove(&user_key);
        }

        Ok(updated)
    }

    async fn mark_cancelled(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let record = state.find_mut(id).ok_or_else(|| not_found(id))?;
        record.mark_cancelled(now);
        Ok(record.clone())
    }

    async fn deactivate(
        &self,
        id: &SubscriptionId,
        mark_cancelled: bool,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let record = state.find_mut(id).ok_or_else(|| not_found(id))?;
        record.deactivate(now);
        if mark_cancelled {
            record.mark_cancelled(now);
        }
        let updated = record.clone();

        let user_key = updated.user_id.as_str().to_string();
        if state.current.get(&user_key) == Some(id) {
            state.current.remove(&user_key);
        }

        Ok(updated)
    }

    async fn sweep_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        self.check_writable()?;
        let mut state = self.state.write().await;

        let mut swept = 0u64;
        let mut reverted_users = Vec::new();
        for record in state.records.iter_mut() {
            if record.is_expired(now) {
                record.deactivate(now);
                reverted_users.push((record.user_id.as_str().to_string(), record.id));
                swept += 1;
            }
        }
        for (user_key, id) in reverted_users {
            if state.current.get(&user_key) == Some(&id) {
                state.current.remove(&user_key);
            }
        }

        Ok(swept)
    }

    async fn current_plan(&self, user_id: &UserId) -> Result<UserPlan, DomainError> {
        let state = self.state.read().await;

        if let Some(id) = state.current.get(user_id.as_str()) {
            if let Some(record) = state.records.iter().find(|r| r.id == *id && r.active) {
                return Ok(UserPlan {
                    plan_key: record.plan_key.clone(),
                    expires_at: Some(record.expires_at),
                    record_id: Some(record.id),
                });
            }
        }

        Ok(UserPlan {
            plan_key: self.default_plan_key.clone(),
            expires_at: None,
            record_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{Plan, PlanFeatures};
    use crate::domain::foundation::Money;

    fn basico() -> Plan {
        Plan {
            key: "basico".to_string(),
            name: "Básico".to_string(),
            price: Money::from_cents(5000).unwrap(),
            term_days: 30,
            features: PlanFeatures::default(),
            display_order: 1,
            active: true,
        }
    }

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn pending(user_id: &UserId, now: Timestamp) -> SubscriptionRecord {
        SubscriptionRecord::create_pending(
            SubscriptionId::new(),
            user_id.clone(),
            &basico(),
            "manual",
            None,
            None,
            now,
        )
    }

    #[tokio::test]
    async fn confirm_and_activate_deactivates_previous_record() {
        let ledger = InMemoryLedger::new("gratis");
        let u = user("user-7");
        let now = Timestamp::now();

        let first = pending(&u, now);
        let second = pending(&u, now);
        ledger.insert(&first).await.unwrap();
        ledger.insert(&second).await.unwrap();

        ledger.confirm_and_activate(&first.id, None, now).await.unwrap();
        ledger.confirm_and_activate(&second.id, None, now).await.unwrap();

        let active = ledger.active_for_user(&u).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);

        let history = ledger.history_for_user(&u).await.unwrap();
        assert_eq!(history.iter().filter(|r| r.active).count(), 1);
    }

    #[tokio::test]
    async fn confirm_is_idempotent() {
        let ledger = InMemoryLedger::new("gratis");
        let u = user("user-7");
        let now = Timestamp::now();

        let record = pending(&u, now);
        ledger.insert(&record).await.unwrap();

        let first = ledger
            .confirm_and_activate(&record.id, Some("sess_123"), now)
            .await
            .unwrap();
        let second = ledger
            .confirm_and_activate(&record.id, Some("sess_123"), now)
            .await
            .unwrap();

        assert!(!first.is_duplicate());
        assert!(second.is_duplicate());
    }

    #[tokio::test]
    async fn confirm_missing_record_is_not_found() {
        let ledger = InMemoryLedger::new("gratis");
        let err = ledger
            .confirm_and_activate(&SubscriptionId::new(), None, Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn attach_reference_is_set_once() {
        let ledger = InMemoryLedger::new("gratis");
        let u = user("user-7");
        let now = Timestamp::now();

        let record = pending(&u, now);
        ledger.insert(&record).await.unwrap();

        ledger
            .attach_external_reference(&record.id, "sess_1", now)
            .await
            .unwrap();
        // Re-attaching the same reference is a no-op
        ledger
            .attach_external_reference(&record.id, "sess_1", now)
            .await
            .unwrap();
        // A different reference is rejected
        assert!(ledger
            .attach_external_reference(&record.id, "sess_2", now)
            .await
            .is_err());

        let found = ledger.find_by_external_reference("sess_1").await.unwrap();
        assert_eq!(found.unwrap().id, record.id);
    }

    #[tokio::test]
    async fn deactivate_reverts_current_plan() {
        let ledger = InMemoryLedger::new("gratis");
        let u = user("user-7");
        let now = Timestamp::now();

        let record = pending(&u, now);
        ledger.insert(&record).await.unwrap();
        ledger.confirm_and_activate(&record.id, None, now).await.unwrap();

        let plan = ledger.current_plan(&u).await.unwrap();
        assert_eq!(plan.plan_key, "basico");

        let updated = ledger.deactivate(&record.id, true, now).await.unwrap();
        assert!(!updated.active);
        assert!(updated.cancelled);

        let plan = ledger.current_plan(&u).await.unwrap();
        assert_eq!(plan.plan_key, "gratis");
        assert!(plan.record_id.is_none());
    }

    #[tokio::test]
    async fn sweep_deactivates_only_elapsed_records() {
        let ledger = InMemoryLedger::new("gratis");
        let now = Timestamp::from_unix_secs(1_700_000_000);

        let expiring_user = user("user-1");
        let current_user = user("user-2");

        let expiring = pending(&expiring_user, now.minus_days(31));
        let current = pending(&current_user, now.minus_days(1));
        ledger.insert(&expiring).await.unwrap();
        ledger.insert(&current).await.unwrap();
        ledger
            .confirm_and_activate(&expiring.id, None, now.minus_days(31))
            .await
            .unwrap();
        ledger
            .confirm_and_activate(&current.id, None, now.minus_days(1))
            .await
            .unwrap();

        let swept = ledger.sweep_expired(now).await.unwrap();
        assert_eq!(swept, 1);

        assert_eq!(
            ledger.current_plan(&expiring_user).await.unwrap().plan_key,
            "gratis"
        );
        assert_eq!(
            ledger.current_plan(&current_user).await.unwrap().plan_key,
            "basico"
        );

        // Second sweep finds nothing
        assert_eq!(ledger.sweep_expired(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pending_and_history_are_newest_first() {
        let ledger = InMemoryLedger::new("gratis");
        let u = user("user-7");
        let now = Timestamp::now();

        let older = pending(&u, now);
        let newer = pending(&u, now.plus_secs(60));
        ledger.insert(&older).await.unwrap();
        ledger.insert(&newer).await.unwrap();

        let pending_list = ledger.pending_for_user(&u).await.unwrap();
        assert_eq!(pending_list[0].id, newer.id);
        assert_eq!(pending_list[1].id, older.id);
    }

    #[tokio::test]
    async fn error_injection_fails_writes() {
        let ledger = InMemoryLedger::new("gratis");
        ledger.set_fail_writes(true);

        let record = pending(&user("user-7"), Timestamp::now());
        let err = ledger.insert(&record).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
