//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum REST API
//! - `memory` - In-memory catalog and ledger (tests, local development)
//! - `postgres` - Durable ledger persistence
//! - `stripe` - Payment gateway integration

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
