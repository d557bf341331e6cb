// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod ledger_store;
pub mod frame_renderer;
pub mod robot_responder;
pub mod dataset_exporter;

pub use ledger_store::{LedgerSnapshot, LedgerStore, LEDGER_FORMAT_VERSION};
pub use frame_renderer::FrameRenderer;
pub use robot_responder::RobotResponder;
pub use dataset_exporter::DatasetExporter;

#[cfg(test)]
pub use ledger_store::MockLedgerStore;
#[cfg(test)]
pub use robot_responder::MockRobotResponder;
