//! Live-database tests for the Postgres ledger.
//!
//! These run against a real PostgreSQL instance and are ignored by
//! default. Point DATABASE_URL at a throwaway database and run:
//!
//!     cargo test --test postgres_ledger -- --ignored

use std::env;

use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use coach_billing::adapters::postgres::PostgresLedger;
use coach_billing::domain::catalog::{Plan, PlanFeatures};
use coach_billing::domain::foundation::{Money, SubscriptionId, Timestamp, UserId};
use coach_billing::domain::subscription::{PaymentState, SubscriptionRecord};
use coach_billing::ports::SubscriptionLedger;

async fn ledger() -> PostgresLedger {
    let url = env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    PostgresLedger::new(pool, "gratis")
}

fn fresh_user() -> UserId {
    UserId::new(format!("user-{}", Uuid::new_v4())).unwrap()
}

fn fresh_reference(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4())
}

fn paid_plan(key: &str, cents: i64) -> Plan {
    Plan {
        key: key.to_string(),
        name: key.to_string(),
        price: Money::from_cents(cents).unwrap(),
        term_days: 30,
        features: PlanFeatures::default(),
        display_order: 1,
        active: true,
    }
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn upgrade_confirmation_replaces_the_active_record() {
    let ledger = ledger().await;
    let user = fresh_user();
    let now = Timestamp::now();

    // The user already holds an active subscription
    let current = SubscriptionRecord::create_confirmed(
        SubscriptionId::new(),
        user.clone(),
        "basico".to_string(),
        Money::from_cents(5000).unwrap(),
        "stripe",
        Some(fresh_reference("sess")),
        30,
        now,
    );
    ledger.insert_confirmed(&current).await.unwrap();

    // The upgrade starts as a pending record for the same user
    let upgrade = SubscriptionRecord::create_pending(
        SubscriptionId::new(),
        user.clone(),
        &paid_plan("premium", 10_000),
        "stripe",
        None,
        None,
        now,
    );
    ledger.insert(&upgrade).await.unwrap();

    // Confirming must not trip the single-active-row unique index
    let reference = fresh_reference("sess");
    let outcome = ledger
        .confirm_and_activate(&upgrade.id, Some(reference.as_str()), Timestamp::now())
        .await
        .unwrap();
    assert!(!outcome.is_duplicate());

    let activated = ledger.find_by_id(&upgrade.id).await.unwrap().unwrap();
    assert!(activated.active);
    assert_eq!(activated.payment_state, PaymentState::Confirmed);

    let replaced = ledger.find_by_id(&current.id).await.unwrap().unwrap();
    assert!(!replaced.active);
    assert_eq!(replaced.payment_state, PaymentState::Confirmed);

    let plan = ledger.current_plan(&user).await.unwrap();
    assert_eq!(plan.plan_key, "premium");
    assert_eq!(plan.record_id, Some(upgrade.id));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn redelivered_confirmation_is_a_duplicate() {
    let ledger = ledger().await;
    let user = fresh_user();
    let now = Timestamp::now();

    let record = SubscriptionRecord::create_pending(
        SubscriptionId::new(),
        user.clone(),
        &paid_plan("basico", 5000),
        "stripe",
        Some(fresh_reference("sess")),
        None,
        now,
    );
    ledger.insert(&record).await.unwrap();

    let first = ledger
        .confirm_and_activate(&record.id, None, Timestamp::now())
        .await
        .unwrap();
    assert!(!first.is_duplicate());

    let second = ledger
        .confirm_and_activate(&record.id, None, Timestamp::now())
        .await
        .unwrap();
    assert!(second.is_duplicate());

    let stored = ledger.find_by_id(&record.id).await.unwrap().unwrap();
    assert!(stored.active);
    assert_eq!(stored.payment_state, PaymentState::Confirmed);
}
