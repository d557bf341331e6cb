pub mod session_ledger;

pub use session_ledger::SessionLedger;
