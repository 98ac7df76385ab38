//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Persists subscription records in a single append-only table. The
//! active flag doubles as the per-user projection: at most one active
//! row per user, maintained inside the same transaction as each state
//! change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, SubscriptionId, Timestamp, UserId,
};
use crate::domain::subscription::{ConfirmOutcome, PaymentState, SubscriptionRecord};
use crate::ports::{SubscriptionLedger, UserPlan};

/// PostgreSQL implementation of the SubscriptionLedger port.
///
/// Uses sqlx with connection pooling; multi-step operations run in
/// transactions with row locks on the target record.
pub struct PostgresLedger {
    pool: PgPool,
    default_plan_key: String,
}

impl PostgresLedger {
    pub fn new(pool: PgPool, default_plan_key: impl Into<String>) -> Self {
        Self {
            pool,
            default_plan_key: default_plan_key.into(),
        }
    }
}

/// Database row representation of a subscription record.
#[derive(Debug, sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    user_id: String,
    plan_key: String,
    amount_cents: i64,
    payment_method: String,
    external_reference: Option<String>,
    payment_state: String,
    active: bool,
    cancelled: bool,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
            plan_key: row.plan_key,
            amount: Money::from_cents(row.amount_cents)
                .map_err(|e| DomainError::new(ErrorCode::DatabaseError, e.to_string()))?,
            payment_method: row.payment_method,
            external_reference: row.external_reference,
            payment_state: parse_state(&row.payment_state)?,
            active: row.active,
            cancelled: row.cancelled,
            started_at: Timestamp::from_datetime(row.started_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_state(s: &str) -> Result<PaymentState, DomainError> {
    match s {
        "pending" => Ok(PaymentState::Pending),
        "confirmed" => Ok(PaymentState::Confirmed),
        "rejected" => Ok(PaymentState::Rejected),
        "refunded" => Ok(PaymentState::Refunded),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment state value: {}", s),
        )),
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn not_found(id: &SubscriptionId) -> DomainError {
    DomainError::new(
        ErrorCode::SubscriptionNotFound,
        format!("Subscription not found: {}", id),
    )
}

const SELECT_COLUMNS: &str = "id, user_id, plan_key, amount_cents, payment_method, \
     external_reference, payment_state, active, cancelled, \
     started_at, expires_at, created_at, updated_at";

#[async_trait]
impl SubscriptionLedger for PostgresLedger {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_records (
                id, user_id, plan_key, amount_cents, payment_method,
                external_reference, payment_state, active, cancelled,
                started_at, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(&record.plan_key)
        .bind(record.amount.cents())
        .bind(&record.payment_method)
        .bind(&record.external_reference)
        .bind(record.payment_state.as_str())
        .bind(record.active)
        .bind(record.cancelled)
        .bind(record.started_at.as_datetime())
        .bind(record.expires_at.as_datetime())
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert record", e))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find record", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE external_reference = $1",
            SELECT_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find record by reference", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn pending_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records \
             WHERE user_id = $1 AND payment_state = 'pending' \
             ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list pending records", e))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }

    async fn active_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records \
             WHERE user_id = $1 AND active \
             ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find active record", e))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records \
             WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list history", e))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }

    async fn attach_external_reference(
        &self,
        id: &SubscriptionId,
        reference: &str,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_records
            SET external_reference = $2, updated_at = $3
            WHERE id = $1
              AND (external_reference IS NULL OR external_reference = $2)
            "#,
        )
        .bind(id.as_uuid())
        .bind(reference)
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to attach reference", e))?;

        if result.rows_affected() == 0 {
            // Distinguish a missing record from a reference conflict
            return match self.find_by_id(id).await? {
                None => Err(not_found(id)),
                Some(_) => Err(DomainError::validation(
                    "external_reference",
                    "Record already carries a different reference",
                )),
            };
        }

        Ok(())
    }

    async fn confirm_and_activate(
        &self,
        id: &SubscriptionId,
        external_reference: Option<&str>,
        now: Timestamp,
    ) -> Result<ConfirmOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock record", e))?;

        let row = row.ok_or_else(|| not_found(id))?;
        let mut record = SubscriptionRecord::try_from(row)?;

        let outcome = record
            .confirm(external_reference, now)
            .map_err(DomainError::from)?;

        if let ConfirmOutcome::AlreadyConfirmed(_) = outcome {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back", e))?;
            return Ok(outcome);
        }

        // Deactivate before activating: the partial unique index on
        // (user_id) WHERE active checks each statement, so the old active
        // row must clear first
        sqlx::query(
            r#"
            UPDATE subscription_records
            SET active = FALSE, updated_at = $3
            WHERE user_id = $1 AND id <> $2 AND active
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to deactivate other records", e))?;

        sqlx::query(
            r#"
            UPDATE subscription_records
            SET payment_state = 'confirmed',
                active = TRUE,
                external_reference = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&record.external_reference)
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to confirm record", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        Ok(outcome)
    }

    async fn insert_confirmed(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            UPDATE subscription_records
            SET active = FALSE, updated_at = $2
            WHERE user_id = $1 AND active
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(record.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to deactivate other records", e))?;

        sqlx::query(
            r#"
            INSERT INTO subscription_records (
                id, user_id, plan_key, amount_cents, payment_method,
                external_reference, payment_state, active, cancelled,
                started_at, expires_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_str())
        .bind(&record.plan_key)
        .bind(record.amount.cents())
        .bind(&record.payment_method)
        .bind(&record.external_reference)
        .bind(record.payment_state.as_str())
        .bind(record.active)
        .bind(record.cancelled)
        .bind(record.started_at.as_datetime())
        .bind(record.expires_at.as_datetime())
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert confirmed record", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit", e))?;

        Ok(())
    }

    async fn mark_refunded(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscription_records
            SET payment_state = 'refunded', active = FALSE, updated_at = $2
            WHERE id = $1 AND payment_state = 'confirmed'
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark refunded", e))?;

        match row {
            Some(row) => SubscriptionRecord::try_from(row),
            None => match self.find_by_id(id).await? {
                None => Err(not_found(id)),
                Some(record) => Err(DomainError::new(
                    ErrorCode::InvalidStateTransition,
                    format!(
                        "Cannot refund a record in {} state",
                        record.payment_state.as_str()
                    ),
                )),
            },
        }
    }

    async fn mark_cancelled(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscription_records
            SET cancelled = TRUE,
                updated_at = CASE WHEN cancelled THEN updated_at ELSE $2 END
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark cancelled", e))?;

        row.ok_or_else(|| not_found(id))
            .and_then(SubscriptionRecord::try_from)
    }

    async fn deactivate(
        &self,
        id: &SubscriptionId,
        mark_cancelled: bool,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, DomainError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            r#"
            UPDATE subscription_records
            SET active = FALSE,
                cancelled = cancelled OR $2,
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .bind(mark_cancelled)
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to deactivate record", e))?;

        row.ok_or_else(|| not_found(id))
            .and_then(SubscriptionRecord::try_from)
    }

    async fn sweep_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_records
            SET active = FALSE, updated_at = $1
            WHERE active AND expires_at <= $1
            "#,
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to sweep expired records", e))?;

        Ok(result.rows_affected())
    }

    async fn current_plan(&self, user_id: &UserId) -> Result<UserPlan, DomainError> {
        match self.active_for_user(user_id).await? {
            Some(record) => Ok(UserPlan {
                plan_key: record.plan_key,
                expires_at: Some(record.expires_at),
                record_id: Some(record.id),
            }),
            None => Ok(UserPlan {
                plan_key: self.default_plan_key.clone(),
                expires_at: None,
                record_id: None,
            }),
        }
    }
}
