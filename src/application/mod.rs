//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;

pub use handlers::subscription::{
    // Commands
    CancelCommand, CancelHandler, CancelResult,
    ConfirmPaymentCommand, ConfirmPaymentHandler, ConfirmPaymentResult,
    PurchaseCommand, PurchaseHandler, PurchaseResult,
    ReconcileEventCommand, ReconcileEventHandler, ReconcileEventResult, ReconcileOutcome,
    SweepExpiredCommand, SweepExpiredHandler, SweepExpiredResult,
    // Queries
    CurrentPlanHandler, CurrentPlanQuery, CurrentPlanResult,
    HistoryEntry, HistoryHandler, HistoryQuery, HistoryResult,
};
