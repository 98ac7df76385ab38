//! In-memory adapters for tests and local development.

mod in_memory_catalog;
mod in_memory_ledger;

pub use in_memory_catalog::InMemoryCatalog;
pub use in_memory_ledger::InMemoryLedger;
