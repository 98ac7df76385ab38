//! In-memory implementation of PlanCatalog.
//!
//! Serves a fixed set of plans and payment methods from memory. Used in
//! tests and local development; the seeded catalog mirrors the production
//! defaults.

use async_trait::async_trait;

use crate::domain::catalog::{PaymentMethod, Plan, PlanFeatures};
use crate::domain::foundation::{DomainError, Money};
use crate::ports::PlanCatalog;

/// In-memory, read-only plan catalog.
pub struct InMemoryCatalog {
    plans: Vec<Plan>,
    payment_methods: Vec<PaymentMethod>,
    default_plan_key: String,
}

impl InMemoryCatalog {
    /// Creates a catalog with explicit contents.
    pub fn new(
        plans: Vec<Plan>,
        payment_methods: Vec<PaymentMethod>,
        default_plan_key: impl Into<String>,
    ) -> Self {
        Self {
            plans,
            payment_methods,
            default_plan_key: default_plan_key.into(),
        }
    }

    /// Creates a catalog seeded with the standard three-tier offering.
    pub fn seeded() -> Self {
        Self::new(
            vec![gratis(), basico(), premium()],
            vec![
                PaymentMethod {
                    key: "stripe".to_string(),
                    name: "Tarjeta".to_string(),
                    requires_reference: false,
                    display_order: 0,
                    active: true,
                },
                PaymentMethod {
                    key: "transferencia".to_string(),
                    name: "Transferencia bancaria".to_string(),
                    requires_reference: true,
                    display_order: 1,
                    active: true,
                },
                PaymentMethod {
                    key: "qr".to_string(),
                    name: "Pago QR".to_string(),
                    requires_reference: true,
                    display_order: 2,
                    active: true,
                },
            ],
            "gratis",
        )
    }
}

fn gratis() -> Plan {
    Plan {
        key: "gratis".to_string(),
        name: "Gratis".to_string(),
        price: Money::ZERO,
        term_days: 0,
        features: PlanFeatures::default(),
        display_order: 0,
        active: true,
    }
}

fn basico() -> Plan {
    Plan {
        key: "basico".to_string(),
        name: "Básico".to_string(),
        price: Money::from_cents(5000).unwrap_or(Money::ZERO),
        term_days: 30,
        features: PlanFeatures {
            daily_minutes: 60,
            voice_feedback: true,
            angle_analysis: false,
            history_days: 30,
            ads: false,
            custom_routines: false,
            priority_support: false,
        },
        display_order: 1,
        active: true,
    }
}

fn premium() -> Plan {
    Plan {
        key: "premium".to_string(),
        name: "Premium".to_string(),
        price: Money::from_cents(10000).unwrap_or(Money::ZERO),
        term_days: 30,
        features: PlanFeatures {
            daily_minutes: -1,
            voice_feedback: true,
            angle_analysis: true,
            history_days: -1,
            ads: false,
            custom_routines: true,
            priority_support: true,
        },
        display_order: 2,
        active: true,
    }
}

#[async_trait]
impl PlanCatalog for InMemoryCatalog {
    async fn list_active_plans(&self) -> Result<Vec<Plan>, DomainError> {
        let mut active: Vec<Plan> = self.plans.iter().filter(|p| p.active).cloned().collect();
        active.sort_by_key(|p| (p.display_order, p.price.cents()));
        Ok(active)
    }

    async fn plan(&self, key: &str) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.iter().find(|p| p.key == key).cloned())
    }

    async fn list_active_payment_methods(&self) -> Result<Vec<PaymentMethod>, DomainError> {
        let mut active: Vec<PaymentMethod> = self
            .payment_methods
            .iter()
            .filter(|m| m.active)
            .cloned()
            .collect();
        active.sort_by_key(|m| (m.display_order, m.key.clone()));
        Ok(active)
    }

    async fn payment_method(&self, key: &str) -> Result<Option<PaymentMethod>, DomainError> {
        Ok(self.payment_methods.iter().find(|m| m.key == key).cloned())
    }

    fn default_plan_key(&self) -> &str {
        &self.default_plan_key
    }
}
