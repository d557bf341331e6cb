pub mod json_ledger_store;
pub mod in_memory_ledger_store;

pub use json_ledger_store::JsonFileLedgerStore;
pub use in_memory_ledger_store::InMemoryLedgerStore;
