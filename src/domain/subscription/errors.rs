//! Subscription-specific error types.
//!
//! Errors related to purchase, confirmation, cancellation, and
//! reconciliation of subscription records.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InvalidPlan | 400 |
//! | NotFound | 404 |
//! | Unauthorized | 403 |
//! | NoActiveSubscription | 409 |
//! | AuthenticityCheckFailed | 400 |
//! | GatewayUnavailable | 502 |
//! | InvalidState | 409 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, UserId, ValidationError};

/// Subscription-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Plan key does not resolve to an active plan.
    InvalidPlan(String),

    /// Subscription record was not found.
    NotFound(SubscriptionId),

    /// Record exists but is not owned by the caller.
    Unauthorized(SubscriptionId),

    /// Cancellation targeted a record that is not the user's active one.
    NoActiveSubscription(UserId),

    /// Inbound gateway event failed signature verification.
    AuthenticityCheckFailed,

    /// Outbound call to the payment gateway failed.
    ///
    /// Carries the id of the pending record that was already persisted,
    /// so the caller can retry checkout creation without re-purchasing.
    GatewayUnavailable {
        record_id: SubscriptionId,
        reason: String,
    },

    /// Invalid settlement state for the requested operation.
    InvalidState {
        current: String,
        attempted: String,
    },

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl SubscriptionError {
    // Constructor functions for cleaner error creation

    pub fn invalid_plan(key: impl Into<String>) -> Self {
        SubscriptionError::InvalidPlan(key.into())
    }

    pub fn not_found(id: SubscriptionId) -> Self {
        SubscriptionError::NotFound(id)
    }

    pub fn unauthorized(id: SubscriptionId) -> Self {
        SubscriptionError::Unauthorized(id)
    }

    pub fn no_active_subscription(user_id: UserId) -> Self {
        SubscriptionError::NoActiveSubscription(user_id)
    }

    pub fn authenticity_check_failed() -> Self {
        SubscriptionError::AuthenticityCheckFailed
    }

    pub fn gateway_unavailable(record_id: SubscriptionId, reason: impl Into<String>) -> Self {
        SubscriptionError::GatewayUnavailable {
            record_id,
            reason: reason.into(),
        }
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        SubscriptionError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::InvalidPlan(_) => ErrorCode::InvalidPlan,
            SubscriptionError::NotFound(_) => ErrorCode::SubscriptionNotFound,
            SubscriptionError::Unauthorized(_) => ErrorCode::Unauthorized,
            SubscriptionError::NoActiveSubscription(_) => ErrorCode::NoActiveSubscription,
            SubscriptionError::AuthenticityCheckFailed => ErrorCode::AuthenticityCheckFailed,
            SubscriptionError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::InvalidPlan(key) => {
                format!("Plan '{}' does not exist or is not active", key)
            }
            SubscriptionError::NotFound(id) => format!("Subscription not found: {}", id),
            SubscriptionError::Unauthorized(id) => {
                format!("Subscription {} is not owned by the caller", id)
            }
            SubscriptionError::NoActiveSubscription(user_id) => {
                format!("User {} has no active subscription matching the request", user_id)
            }
            SubscriptionError::AuthenticityCheckFailed => {
                "Event signature verification failed".to_string()
            }
            SubscriptionError::GatewayUnavailable { record_id, reason } => {
                format!(
                    "Payment gateway unavailable ({}); pending record {} was kept",
                    reason, record_id
                )
            }
            SubscriptionError::InvalidState { current, attempted } => {
                format!("Cannot {} a subscription in {} state", attempted, current)
            }
            SubscriptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Infrastructure(_) | SubscriptionError::GatewayUnavailable { .. }
        )
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field } => field.clone(),
            ValidationError::OutOfRange { field, .. } => field.clone(),
            ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        SubscriptionError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InvalidPlan | ErrorCode::PlanNotFound => {
                SubscriptionError::InvalidPlan(err.message)
            }
            ErrorCode::Unauthorized | ErrorCode::Forbidden => {
                SubscriptionError::Infrastructure(err.to_string())
            }
            ErrorCode::NoActiveSubscription => {
                SubscriptionError::Infrastructure(err.to_string())
            }
            ErrorCode::InvalidStateTransition => SubscriptionError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            ErrorCode::AuthenticityCheckFailed => SubscriptionError::AuthenticityCheckFailed,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => SubscriptionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            _ => SubscriptionError::Infrastructure(err.to_string()),
        }
    }
}

impl From<SubscriptionError> for DomainError {
    fn from(err: SubscriptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record_id() -> SubscriptionId {
        SubscriptionId::new()
    }

    fn test_user_id() -> UserId {
        UserId::new("user-7").unwrap()
    }

    #[test]
    fn invalid_plan_creates_correctly() {
        let err = SubscriptionError::invalid_plan("mega");
        assert!(matches!(err, SubscriptionError::InvalidPlan(ref k) if k == "mega"));
        assert_eq!(err.code(), ErrorCode::InvalidPlan);
    }

    #[test]
    fn not_found_creates_correctly() {
        let id = test_record_id();
        let err = SubscriptionError::not_found(id);
        assert!(matches!(err, SubscriptionError::NotFound(i) if i == id));
        assert_eq!(err.code(), ErrorCode::SubscriptionNotFound);
    }

    #[test]
    fn unauthorized_creates_correctly() {
        let id = test_record_id();
        let err = SubscriptionError::unauthorized(id);
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[test]
    fn no_active_subscription_creates_correctly() {
        let err = SubscriptionError::no_active_subscription(test_user_id());
        assert_eq!(err.code(), ErrorCode::NoActiveSubscription);
    }

    #[test]
    fn gateway_unavailable_carries_record_id() {
        let id = test_record_id();
        let err = SubscriptionError::gateway_unavailable(id, "connection refused");
        match &err {
            SubscriptionError::GatewayUnavailable { record_id, reason } => {
                assert_eq!(*record_id, id);
                assert_eq!(reason, "connection refused");
            }
            _ => panic!("Expected GatewayUnavailable"),
        }
        assert!(err.message().contains(&id.to_string()));
    }

    #[test]
    fn invalid_state_creates_correctly() {
        let err = SubscriptionError::invalid_state("rejected", "confirm");
        assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
        assert!(err.message().contains("rejected"));
        assert!(err.message().contains("confirm"));
    }

    #[test]
    fn gateway_and_infrastructure_errors_are_retryable() {
        assert!(SubscriptionError::infrastructure("timeout").is_retryable());
        assert!(
            SubscriptionError::gateway_unavailable(test_record_id(), "timeout").is_retryable()
        );
    }

    #[test]
    fn authenticity_failure_is_not_retryable() {
        assert!(!SubscriptionError::authenticity_check_failed().is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = SubscriptionError::validation("plan_key", "empty");
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_matches_message() {
        let err = SubscriptionError::invalid_plan("unknown");
        assert_eq!(format!("{}", err), err.message());
    }

    #[test]
    fn converts_to_domain_error() {
        let err = SubscriptionError::not_found(test_record_id());
        let domain_err: DomainError = err.clone().into();
        assert_eq!(domain_err.code, err.code());
    }

    #[test]
    fn converts_from_domain_error() {
        let domain_err = DomainError::new(ErrorCode::InvalidPlan, "mega");
        let err: SubscriptionError = domain_err.into();
        assert_eq!(err.code(), ErrorCode::InvalidPlan);
    }

    #[test]
    fn converts_from_validation_error() {
        let err: SubscriptionError = ValidationError::empty_field("external_reference").into();
        match err {
            SubscriptionError::ValidationFailed { field, .. } => {
                assert_eq!(field, "external_reference")
            }
            _ => panic!("Expected ValidationFailed"),
        }
    }
}
