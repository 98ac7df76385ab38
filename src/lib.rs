//! Coach Billing - Subscription Lifecycle & Payment Reconciliation Engine
//!
//! This crate turns a user's purchase intent into a durable, auditable
//! subscription record, reconciles that record against asynchronous gateway
//! events, and enforces at most one active subscription per user.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
