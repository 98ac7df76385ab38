//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresLedger` - Durable subscription record persistence

mod subscription_ledger;

pub use subscription_ledger::PostgresLedger;
