// Implementations of the ledger store.

pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
pub use in_memory::InMemoryLedgerStore;
pub use sqlite_store::SqliteLedgerStore;
