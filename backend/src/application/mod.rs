// Application layer - ledger, streaming and use cases
// Orchestrates domain logic, depends on domain layer only

pub mod ports;
pub mod ledger;
pub mod streaming;
pub mod commands;
pub mod export;
