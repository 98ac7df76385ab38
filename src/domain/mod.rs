//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `catalog` - Plan and payment method reference data
//! - `subscription` - Subscription lifecycle, reconciliation state machine, and webhook verification

pub mod catalog;
pub mod foundation;
pub mod subscription;
