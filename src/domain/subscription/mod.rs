//! Subscription module - Lifecycle state machine and reconciliation types.
//!
//! The `SubscriptionRecord` aggregate is the ledger entry; `PaymentState`
//! defines its settlement state machine. `GatewayEvent` and the signature
//! verifier cover the inbound reconciliation boundary.

mod errors;
mod event_verifier;
mod gateway_event;
mod payment_state;
mod record;

pub use errors::SubscriptionError;
pub use event_verifier::{GatewayEventVerifier, SignatureError, SignatureHeader};
pub use gateway_event::{GatewayEvent, GatewayEventKind};
pub use payment_state::PaymentState;
pub use record::{ConfirmOutcome, SubscriptionRecord};

#[cfg(test)]
pub use event_verifier::compute_test_signature;
