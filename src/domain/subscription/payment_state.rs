//! Payment settlement state machine.
//!
//! Defines the settlement states of a subscription record and the
//! transitions the reconciliation engine may apply.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Settlement state of a subscription record.
///
/// Activation is tracked separately on the record (`active` flag); this
/// enum only covers whether the payment itself settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created, awaiting confirmation from the gateway or an operator.
    Pending,

    /// Payment settled. The record may be activated.
    Confirmed,

    /// Gateway or operator declined the payment.
    Rejected,

    /// Settled payment was returned to the payer.
    Refunded,
}

impl PaymentState {
    /// Returns true once the payment has settled.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentState::Confirmed | PaymentState::Refunded)
    }

    /// Stable string form used in storage and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Confirmed => "confirmed",
            PaymentState::Rejected => "rejected",
            PaymentState::Refunded => "refunded",
        }
    }
}

impl StateMachine for PaymentState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentState::*;
        matches!(
            (self, target),
            (Pending, Confirmed) | (Pending, Rejected) | (Confirmed, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentState::*;
        match self {
            Pending => vec![Confirmed, Rejected],
            Confirmed => vec![Refunded],
            Rejected => vec![],
            Refunded => vec![],
        }
    }
}
