//! SweepExpiredHandler - Command handler for the expiration sweep.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionError;
use crate::ports::SubscriptionLedger;

/// Command to deactivate records whose paid term has elapsed.
#[derive(Debug, Clone)]
pub struct SweepExpiredCommand {
    /// Sweep reference time, normally `Timestamp::now()`.
    pub now: Timestamp,
}

/// Result of one sweep pass.
#[derive(Debug, Clone)]
pub struct SweepExpiredResult {
    pub swept: u64,
}

/// Handler running one expiration sweep.
///
/// Each pass deactivates every active record past its expiration and
/// reverts the affected users to the default plan. The pass is
/// idempotent: an immediate re-run finds nothing.
pub struct SweepExpiredHandler {
    ledger: Arc<dyn SubscriptionLedger>,
}

impl SweepExpiredHandler {
    pub fn new(ledger: Arc<dyn SubscriptionLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        cmd: SweepExpiredCommand,
    ) -> Result<SweepExpiredResult, SubscriptionError> {
        let swept = self.ledger.sweep_expired(cmd.now).await?;

        if swept > 0 {
            info!(swept, "Expiration sweep deactivated records");
        }

        Ok(SweepExpiredResult { swept })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryLedger;
    use crate::domain::catalog::{Plan, PlanFeatures};
    use crate::domain::foundation::{Money, SubscriptionId, UserId};
    use crate::domain::subscription::SubscriptionRecord;

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

    async fn activate_at(ledger: &InMemoryLedger, user: &str, at: Timestamp) -> SubscriptionRecord {
        let record = SubscriptionRecord::create_pending(
            SubscriptionId::new(),
            UserId::new(user).unwrap(),
            &basico(),
            "transferencia",
            None,
            None,
            at,
        );
        ledger.insert(&record).await.unwrap();
        ledger
            .confirm_and_activate(&record.id, None, at)
            .await
            .unwrap()
            .into_record()
    }

    #[tokio::test]
    async fn sweeps_records_at_and_past_expiration() {
        let ledger = Arc::new(InMemoryLedger::new("gratis"));
        let base = Timestamp::from_unix_secs(1_700_000_000);

        let expired = activate_at(&ledger, "user-1", base.minus_days(31)).await;
        let at_boundary = activate_at(&ledger, "user-2", base.minus_days(30)).await;
        let current = activate_at(&ledger, "user-3", base.minus_days(29)).await;

        let handler = SweepExpiredHandler::new(ledger.clone());
        let result = handler.handle(SweepExpiredCommand { now: base }).await.unwrap();

        assert_eq!(result.swept, 2);
        assert!(!ledger.find_by_id(&expired.id).await.unwrap().unwrap().active);
        assert!(!ledger.find_by_id(&at_boundary.id).await.unwrap().unwrap().active);
        assert!(ledger.find_by_id(&current.id).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let ledger = Arc::new(InMemoryLedger::new("gratis"));
        let base = Timestamp::from_unix_secs(1_700_000_000);
        activate_at(&ledger, "user-1", base.minus_days(31)).await;

        let handler = SweepExpiredHandler::new(ledger);
        let first = handler.handle(SweepExpiredCommand { now: base }).await.unwrap();
        let second = handler.handle(SweepExpiredCommand { now: base }).await.unwrap();

        assert_eq!(first.swept, 1);
        assert_eq!(second.swept, 0);
    }

    #[tokio::test]
    async fn sweep_on_empty_ledger_is_a_no_op() {
        let ledger = Arc::new(InMemoryLedger::new("gratis"));
        let handler = SweepExpiredHandler::new(ledger);

        let result = handler
            .handle(SweepExpiredCommand {
                now: Timestamp::now(),
            })
            .await
            .unwrap();

        assert_eq!(result.swept, 0);
    }
}
