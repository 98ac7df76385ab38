//! State machine trait for status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions on entity lifecycle statuses (payment state, etc.).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!(
///             (self, target),
///             (Pending, Confirmed) |
///             (Pending, Rejected) |
///             // ... etc
///         )
///     }
///
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Pending => vec![Confirmed, Rejected],
///             // ... etc
///         }
///     }
/// }
///
/// // Usage:
/// let new_state = current_state.transition_to(PaymentState::Confirmed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    ///
    /// This is the preferred way to change state, as it ensures
    /// the transition is valid according to the state machine rules.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test enum for StateMachine trait
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestState {
        Open,
        Settled,
        Closed,
    }

    impl StateMachine for TestState {
        fn can_transition_to(&self, target: &Self) -> bool {
            use TestState::*;
            matches!((self, target), (Open, Settled) | (Settled, Closed))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use TestState::*;
            match self {
                Open => vec![Settled],
                Settled => vec![Closed],
                Closed => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_transition() {
        let state = TestState::Open;
        let result = state.transition_to(TestState::Settled);
        assert_eq!(result, Ok(TestState::Settled));
    }

    #[test]
    fn transition_to_fails_for_invalid_transition() {
        let state = TestState::Open;
        let result = state.transition_to(TestState::Closed);
        assert!(result.is_err());
    }

    #[test]
    fn is_terminal_returns_true_for_closed() {
        assert!(TestState::Closed.is_terminal());
    }

    #[test]
    fn is_terminal_returns_false_for_non_terminal() {
        assert!(!TestState::Open.is_terminal());
        assert!(!TestState::Settled.is_terminal());
    }

    #[test]
    fn can_transition_to_is_consistent_with_valid_transitions() {
        for state in [TestState::Open, TestState::Settled, TestState::Closed] {
            for valid_target in state.valid_transitions() {
                assert!(
                    state.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    state,
                    valid_target
                );
            }
        }
    }
}
