// Infrastructure layer - external concerns (filesystem, HTTP, WebSocket, config)
// Implements interfaces defined in application layer

use std::sync::Arc;

use crate::application::commands::{ExportDatasetHandler, IssueCommandHandler};
use crate::application::ledger::SessionLedger;
use crate::application::ports::FrameRenderer;
use crate::application::streaming::{FrameClock, StreamHub};

pub mod bootstrap;
pub mod config;
pub mod driven;    // Output adapters (stores, renderer, responder, exporter)
pub mod driving;   // Input adapters (HTTP, WebSocket)

pub use bootstrap::build_state;
pub use config::Settings;

/// Everything the handlers share, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub ledger: Arc<SessionLedger>,
    pub hub: Arc<StreamHub>,
    /// Present in live mode only
    pub clock: Option<Arc<FrameClock>>,
    pub renderer: Arc<dyn FrameRenderer>,
    pub commands: Arc<IssueCommandHandler>,
    pub exports: Arc<ExportDatasetHandler>,
}
