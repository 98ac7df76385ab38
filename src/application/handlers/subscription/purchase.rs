//! PurchaseHandler - Command handler for starting a subscription purchase.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{SubscriptionError, SubscriptionRecord};
use crate::ports::{
    CheckoutSession, CreateCheckoutRequest, PaymentGateway, PlanCatalog, SubscriptionLedger,
};

/// Command to start a purchase of a paid plan.
#[derive(Debug, Clone)]
pub struct PurchaseCommand {
    pub user_id: UserId,
    pub email: Option<String>,
    pub plan_key: String,
    pub payment_method: String,
    /// Operator-supplied reference for methods that require one.
    pub external_reference: Option<String>,
    /// Overrides the plan's term, used for operator-granted extensions.
    pub term_days_override: Option<i64>,
}

/// Result of a successful purchase start.
#[derive(Debug, Clone)]
pub struct PurchaseResult {
    pub record: SubscriptionRecord,
    /// Present only when the purchase went through the hosted gateway.
    pub checkout_session: Option<CheckoutSession>,
}

/// Handler for starting a purchase.
///
/// Creates a pending ledger record, then (for gateway purchases) a hosted
/// checkout session. The record only activates once the payment is
/// confirmed, either by webhook or by an operator.
pub struct PurchaseHandler {
    catalog: Arc<dyn PlanCatalog>,
    ledger: Arc<dyn SubscriptionLedger>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PurchaseHandler {
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

    pub async fn handle(&self, cmd: PurchaseCommand) -> Result<PurchaseResult, SubscriptionError> {
        // 1. Resolve the plan; purchases require an active, paid plan
        let plan = self
            .catalog
            .plan(&cmd.plan_key)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| SubscriptionError::invalid_plan(&cmd.plan_key))?;

        if plan.is_free() {
            return Err(SubscriptionError::invalid_plan(
                "Free plan cannot be purchased",
            ));
        }

        // 2. Resolve the payment method
        let method = self
            .catalog
            .payment_method(&cmd.payment_method)
            .await?
            .filter(|m| m.active)
            .ok_or_else(|| {
                SubscriptionError::validation("payment_method", "Unknown payment method")
            })?;

        // 3. Methods like bank transfer need an operator-visible reference
        if method.requires_reference
            && cmd
                .external_reference
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(SubscriptionError::validation(
                "external_reference",
                format!("Payment method '{}' requires a reference", method.key),
            ));
        }

        // 4. Persist the pending record before any outbound call
        let now = Timestamp::now();
        let record = SubscriptionRecord::create_pending(
            SubscriptionId::new(),
            cmd.user_id.clone(),
            &plan,
            method.key.clone(),
            cmd.external_reference.clone(),
            cmd.term_days_override,
            now,
        );
        self.ledger.insert(&record).await?;

        info!(
            record_id = %record.id,
            user_id = %record.user_id,
            plan = %record.plan_key,
            method = %record.payment_method,
            "Purchase started"
        );

        // 5. Gateway purchases get a hosted checkout session
        if method.key != self.gateway.method_key() {
            return Ok(PurchaseResult {
                record,
                checkout_session: None,
            });
        }

        let session = self
            .gateway
            .create_checkout_session(CreateCheckoutRequest {
                user_id: cmd.user_id,
                email: cmd.email,
                plan_key: plan.key.clone(),
                plan_name: plan.name.clone(),
                amount: plan.price,
                term_days: plan.term_days,
                record_id: record.id,
            })
            .await
            .map_err(|e| {
                warn!(record_id = %record.id, error = %e, "Checkout creation failed");
                SubscriptionError::gateway_unavailable(record.id, e.message)
            })?;

        // 6. The session id becomes the correlation reference
        self.ledger
            .attach_external_reference(&record.id, &session.id, now)
            .await?;

        let mut record = record;
        record.attach_reference(&session.id, now);

        Ok(PurchaseResult {
            record,
            checkout_session: Some(session),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryLedger};
    use crate::domain::subscription::{GatewayEvent, PaymentState};
    use crate::ports::GatewayError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Mock gateway
    // ════════════════════════════════════════════════════════════════════════════

    pub(crate) struct MockGateway {
        pub sessions_created: Mutex<Vec<CreateCheckoutRequest>>,
        pub fail_checkout: bool,
    }

    impl MockGateway {
        pub(crate) fn new() -> Self {
            Self {
                sessions_created: Mutex::new(Vec::new()),
                fail_checkout: false,
            }
        }

        fn failing() -> Self {
            Self {
                sessions_created: Mutex::new(Vec::new()),
                fail_checkout: true,
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        fn method_key(&self) -> &'static str {
            "stripe"
        }

        async fn create_checkout_session(
            &self,
            request: CreateCheckoutRequest,
        ) -> Result<CheckoutSession, GatewayError> {
            if self.fail_checkout {
                return Err(GatewayError::network("connection refused"));
            }
            let id = format!("sess_{}", request.record_id);
            self.sessions_created.lock().unwrap().push(request);
            Ok(CheckoutSession {
                url: format!("https://checkout.example.com/{}", id),
                id,
            })
        }

        async fn verify_event(
            &self,
            _payload: &[u8],
            _signature: &str,
        ) -> Result<GatewayEvent, GatewayError> {
            Err(GatewayError::invalid_event("Not implemented in mock"))
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Test helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn test_user_id() -> UserId {
        UserId::new("user-7").unwrap()
    }

    fn gateway_command() -> PurchaseCommand {
        PurchaseCommand {
            user_id: test_user_id(),
            email: Some("user@example.com".to_string()),
            plan_key: "basico".to_string(),
            payment_method: "stripe".to_string(),
            external_reference: None,
            term_days_override: None,
        }
    }

    fn manual_command() -> PurchaseCommand {
        PurchaseCommand {
            user_id: test_user_id(),
            email: None,
            plan_key: "basico".to_string(),
            payment_method: "transferencia".to_string(),
            external_reference: Some("TRF-0042".to_string()),
            term_days_override: None,
        }
    }

    fn handler_with(
        gateway: Arc<MockGateway>,
    ) -> (PurchaseHandler, Arc<InMemoryLedger>) {
        let catalog = Arc::new(InMemoryCatalog::seeded());
        let ledger = Arc::new(InMemoryLedger::new("gratis"));
        let handler = PurchaseHandler::new(catalog, ledger.clone(), gateway);
        (handler, ledger)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn gateway_purchase_creates_pending_record_and_session() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, ledger) = handler_with(gateway.clone());

        let result = handler.handle(gateway_command()).await.unwrap();

        assert_eq!(result.record.payment_state, PaymentState::Pending);
        assert!(!result.record.active);
        assert_eq!(result.record.amount.cents(), 5000);

        let session = result.checkout_session.unwrap();
        assert!(session.url.contains(&session.id));
        assert_eq!(
            result.record.external_reference.as_deref(),
            Some(session.id.as_str())
        );

        // Metadata carries the record id for webhook matching
        let requests = gateway.sessions_created.lock().unwrap();
        assert_eq!(requests[0].record_id, result.record.id);

        let stored = ledger.find_by_id(&result.record.id).await.unwrap().unwrap();
        assert_eq!(stored.external_reference, result.record.external_reference);
    }

    #[tokio::test]
    async fn manual_purchase_skips_the_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, _ledger) = handler_with(gateway.clone());

        let result = handler.handle(manual_command()).await.unwrap();

        assert!(result.checkout_session.is_none());
        assert_eq!(
            result.record.external_reference.as_deref(),
            Some("TRF-0042")
        );
        assert!(gateway.sessions_created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn term_override_extends_expiration() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, _ledger) = handler_with(gateway);

        let mut cmd = manual_command();
        cmd.term_days_override = Some(90);
        let result = handler.handle(cmd).await.unwrap();

        assert_eq!(
            result.record.expires_at,
            result.record.started_at.add_days(90)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_plan_is_rejected() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, ledger) = handler_with(gateway);

        let mut cmd = gateway_command();
        cmd.plan_key = "mega".to_string();

        let result = handler.handle(cmd).await;
        assert!(matches!(result, Err(SubscriptionError::InvalidPlan(_))));
        assert!(ledger
            .pending_for_user(&test_user_id())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn free_plan_cannot_be_purchased() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, _ledger) = handler_with(gateway);

        let mut cmd = gateway_command();
        cmd.plan_key = "gratis".to_string();

        let result = handler.handle(cmd).await;
        assert!(matches!(result, Err(SubscriptionError::InvalidPlan(_))));
    }

    #[tokio::test]
    async fn missing_reference_for_manual_method_fails() {
        let gateway = Arc::new(MockGateway::new());
        let (handler, _ledger) = handler_with(gateway);

        let mut cmd = manual_command();
        cmd.external_reference = Some("   ".to_string());

        let result = handler.handle(cmd).await;
        match result {
            Err(SubscriptionError::ValidationFailed { field, .. }) => {
                assert_eq!(field, "external_reference")
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn gateway_failure_keeps_pending_record() {
        let gateway = Arc::new(MockGateway::failing());
        let (handler, ledger) = handler_with(gateway);

        let result = handler.handle(gateway_command()).await;

        let record_id = match result {
            Err(SubscriptionError::GatewayUnavailable { record_id, .. }) => record_id,
            other => panic!("Expected GatewayUnavailable, got {:?}", other),
        };

        // The pending record survives so the checkout can be retried
        let stored = ledger.find_by_id(&record_id).await.unwrap().unwrap();
        assert_eq!(stored.payment_state, PaymentState::Pending);
        assert!(stored.external_reference.is_none());
    }

    #[tokio::test]
    async fn ledger_failure_aborts_before_gateway_call() {
        let gateway = Arc::new(MockGateway::new());
        let catalog = Arc::new(InMemoryCatalog::seeded());
        let ledger = Arc::new(InMemoryLedger::new("gratis"));
        ledger.set_fail_writes(true);

        let handler = PurchaseHandler::new(catalog, ledger, gateway.clone());
        let result = handler.handle(gateway_command()).await;

        assert!(matches!(result, Err(SubscriptionError::Infrastructure(_))));
        assert!(gateway.sessions_created.lock().unwrap().is_empty());
    }
}
