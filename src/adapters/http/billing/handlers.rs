//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::subscription::{
    CancelCommand, CancelHandler, ConfirmPaymentCommand, ConfirmPaymentHandler, CurrentPlanHandler,
    CurrentPlanQuery, HistoryHandler, HistoryQuery, PurchaseCommand, PurchaseHandler,
    ReconcileEventCommand, ReconcileEventHandler,
};
use crate::domain::foundation::{SubscriptionId, UserId};
use crate::domain::subscription::SubscriptionError;
use crate::ports::{PaymentGateway, PlanCatalog, SubscriptionLedger};

use super::dto::{
    CancelRequest, CancelResponse, ConfirmPaymentRequest, ConfirmPaymentResponse,
    CurrentPlanResponse, ErrorResponse, HistoryResponse, PaymentMethodResponse, PlanResponse,
    PurchaseRequest, PurchaseResponse, SubscriptionRecordResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub catalog: Arc<dyn PlanCatalog>,
    pub ledger: Arc<dyn SubscriptionLedger>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn purchase_handler(&self) -> PurchaseHandler {
        PurchaseHandler::new(
            self.catalog.clone(),
            self.ledger.clone(),
            self.gateway.clone(),
        )
    }

    pub fn confirm_payment_handler(&self) -> ConfirmPaymentHandler {
        ConfirmPaymentHandler::new(self.ledger.clone())
    }

    pub fn cancel_handler(&self) -> CancelHandler {
        CancelHandler::new(self.ledger.clone())
    }

    pub fn history_handler(&self) -> HistoryHandler {
        HistoryHandler::new(self.catalog.clone(), self.ledger.clone())
    }

    pub fn current_plan_handler(&self) -> CurrentPlanHandler {
        CurrentPlanHandler::new(self.catalog.clone(), self.ledger.clone())
    }

    pub fn reconcile_handler(&self) -> ReconcileEventHandler {
        ReconcileEventHandler::new(
            self.catalog.clone(),
            self.ledger.clone(),
            self.gateway.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from request.
///
/// In production, this would be extracted from JWT/session by auth middleware.
/// For now, uses a header-based extraction for development/testing.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            // In production, this would validate JWT token from Authorization header
            // For development, we accept an X-User-Id header
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing/plans - List purchasable plans
pub async fn list_plans(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plans = state.catalog.list_active_plans().await?;
    let response: Vec<PlanResponse> = plans.into_iter().map(PlanResponse::from).collect();
    Ok(Json(response))
}

/// GET /api/billing/payment-methods - List accepted payment methods
pub async fn list_payment_methods(
    State(state): State<BillingAppState>,
) -> Result<impl IntoResponse, BillingApiError> {
    let methods = state.catalog.list_active_payment_methods().await?;
    let response: Vec<PaymentMethodResponse> =
        methods.into_iter().map(PaymentMethodResponse::from).collect();
    Ok(Json(response))
}

/// GET /api/billing/me - Get the caller's effective plan
pub async fn get_current_plan(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.current_plan_handler();
    let query = CurrentPlanQuery {
        user_id: user.user_id,
    };

    let result = handler.handle(query).await?;

    let response = CurrentPlanResponse {
        plan: PlanResponse::from(result.plan),
        expires_at: result.expires_at.map(|t| t.as_datetime().to_rfc3339()),
        record_id: result.record_id.map(|id| id.to_string()),
    };

    Ok(Json(response))
}

/// GET /api/billing/history - List the caller's subscription records
pub async fn get_history(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.history_handler();
    let query = HistoryQuery {
        user_id: user.user_id,
    };

    let result = handler.handle(query).await?;

    let response = HistoryResponse {
        records: result
            .entries
            .into_iter()
            .map(SubscriptionRecordResponse::from)
            .collect(),
    };

    Ok(Json(response))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/purchase - Start a purchase
pub async fn purchase(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.purchase_handler();
    let cmd = PurchaseCommand {
        user_id: user.user_id,
        email: request.email,
        plan_key: request.plan_key,
        payment_method: request.payment_method,
        external_reference: request.external_reference,
        term_days_override: None,
    };

    let result = handler.handle(cmd).await?;

    let checkout_url = result.checkout_session.map(|s| s.url);
    let response = PurchaseResponse {
        record: SubscriptionRecordResponse::from_record(result.record, None),
        checkout_url,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/billing/confirm - Confirm a pending payment
pub async fn confirm_payment(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let record_id: SubscriptionId = request
        .record_id
        .parse()
        .map_err(|_| SubscriptionError::validation("record_id", "Not a valid record id"))?;

    let handler = state.confirm_payment_handler();
    let cmd = ConfirmPaymentCommand {
        user_id: user.user_id,
        record_id,
        external_reference: request.external_reference,
    };

    let result = handler.handle(cmd).await?;

    let response = ConfirmPaymentResponse {
        record: SubscriptionRecordResponse::from_record(result.record, None),
        was_duplicate: result.was_duplicate,
    };

    Ok(Json(response))
}

/// POST /api/billing/cancel - Cancel a subscription
pub async fn cancel(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CancelRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let record_id = match request.record_id {
        Some(raw) => Some(
            raw.parse::<SubscriptionId>()
                .map_err(|_| SubscriptionError::validation("record_id", "Not a valid record id"))?,
        ),
        None => None,
    };

    let handler = state.cancel_handler();
    let cmd = CancelCommand {
        user_id: user.user_id,
        record_id,
        immediate: request.immediate,
    };

    let result = handler.handle(cmd).await?;

    let response = CancelResponse {
        record: SubscriptionRecordResponse::from_record(result.record, None),
        deactivated: result.deactivated,
    };

    Ok(Json(response))
}

/// POST /api/webhooks/payment - Reconcile a payment gateway event
///
/// Returns 200 for every accepted delivery, including duplicates and events
/// that reconciliation decided to drop, so the gateway stops retrying. Only
/// authenticity failures and infrastructure errors produce a non-2xx status.
pub async fn handle_payment_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            SubscriptionError::validation("Stripe-Signature", "Missing Stripe-Signature header")
        })?;

    let handler = state.reconcile_handler();
    let cmd = ReconcileEventCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let result = handler.handle(cmd).await?;

    let response = WebhookAckResponse::from_outcome(&result.outcome);
    Ok((StatusCode::OK, Json(response)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
pub struct BillingApiError(SubscriptionError);

impl From<SubscriptionError> for BillingApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for BillingApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(SubscriptionError::from(err))
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            SubscriptionError::InvalidPlan(_) => (StatusCode::BAD_REQUEST, "INVALID_PLAN"),
            SubscriptionError::NotFound(_) => (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND"),
            SubscriptionError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            SubscriptionError::NoActiveSubscription(_) => {
                (StatusCode::CONFLICT, "NO_ACTIVE_SUBSCRIPTION")
            }
            SubscriptionError::AuthenticityCheckFailed => {
                (StatusCode::BAD_REQUEST, "AUTHENTICITY_CHECK_FAILED")
            }
            SubscriptionError::GatewayUnavailable { .. } => {
                (StatusCode::BAD_GATEWAY, "GATEWAY_UNAVAILABLE")
            }
            SubscriptionError::InvalidState { .. } => {
                (StatusCode::CONFLICT, "INVALID_STATE_TRANSITION")
            }
            SubscriptionError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            SubscriptionError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        // Use the error's built-in message() method for consistent messaging
        let message = self.0.message();
        let body = ErrorResponse::new(error_code, message);
        (status, Json(body)).into_response()
    }
}
