//! Plan reference entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Money;

/// Feature flags attached to a plan.
///
/// A value of -1 for a numeric limit means unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeatures {
    /// Training minutes allowed per day (-1 = unlimited).
    pub daily_minutes: i32,

    /// Voice feedback during exercises.
    pub voice_feedback: bool,

    /// Joint angle analysis.
    pub angle_analysis: bool,

    /// Days of workout history retained (-1 = unlimited).
    pub history_days: i32,

    /// Whether ads are shown on this plan.
    pub ads: bool,

    /// Personalized routine generation.
    pub custom_routines: bool,

    /// Priority support channel.
    pub priority_support: bool,
}

impl PlanFeatures {
    /// Returns true if daily training time is unlimited.
    pub fn unlimited_minutes(&self) -> bool {
        self.daily_minutes < 0
    }

    /// Returns true if workout history is retained indefinitely.
    pub fn unlimited_history(&self) -> bool {
        self.history_days < 0
    }
}

impl Default for PlanFeatures {
    fn default() -> Self {
        Self {
            daily_minutes: 10,
            voice_feedback: false,
            angle_analysis: false,
            history_days: 7,
            ads: true,
            custom_routines: false,
            priority_support: false,
        }
    }
}

/// Immutable-per-version plan definition.
///
/// The ledger references plans by key and never mutates them. A plan may be
/// deactivated (no new purchases) while historical records still point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan key, e.g. "gratis", "basico", "premium".
    pub key: String,

    /// Display name.
    pub name: String,

    /// Price per term (fixed point).
    pub price: Money,

    /// Term length in days.
    pub term_days: i64,

    /// Feature flags for this plan.
    pub features: PlanFeatures,

    /// Sort order for catalog listings.
    pub display_order: i32,

    /// Whether the plan can be purchased.
    pub active: bool,
}

impl Plan {
    /// Returns true if this plan is free of charge.
    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}
