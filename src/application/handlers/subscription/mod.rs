//! Subscription handlers.
//!
//! Command and query handlers for the subscription lifecycle:
//!
//! ## Commands
//! - Starting purchases (gateway checkout or manual methods)
//! - Confirming payments (operator side)
//! - Cancelling subscriptions (immediate or deferred)
//! - Reconciling inbound gateway events
//! - Sweeping expired records
//!
//! ## Queries
//! - Subscription history
//! - The caller's effective plan

mod cancel;
mod confirm_payment;
mod current_plan;
mod history;
mod purchase;
mod reconcile_event;
mod sweep_expired;

// Commands
pub use cancel::{CancelCommand, CancelHandler, CancelResult};
pub use confirm_payment::{ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult};
pub use purchase::{PurchaseCommand, PurchaseHandler, PurchaseResult};
pub use reconcile_event::{
    ReconcileEventCommand, ReconcileEventHandler, ReconcileEventResult, ReconcileOutcome,
};
pub use sweep_expired::{SweepExpiredCommand, SweepExpiredHandler, SweepExpiredResult};

// Queries
pub use current_plan::{CurrentPlanHandler, CurrentPlanQuery, CurrentPlanResult};
pub use history::{HistoryEntry, HistoryHandler, HistoryQuery, HistoryResult};
