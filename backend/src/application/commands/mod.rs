// Use cases driven by observers and the export tooling

pub mod issue_command;
pub mod export_dataset;

pub use issue_command::{IssueCommand, IssueCommandHandler, IssueCommandResult, StampSource};
pub use export_dataset::{DatasetFilter, ExportDatasetHandler, ExportResult};
