use anyhow::Result;
use shared::StreamMode;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::application::commands::{ExportDatasetHandler, IssueCommandHandler};
use crate::application::ledger::SessionLedger;
use crate::application::ports::{DatasetExporter, FrameRenderer, LedgerStore, RobotResponder};
use crate::application::streaming::{FrameClock, StreamHub};
use crate::infrastructure::driven::export::JsonDatasetExporter;
use crate::infrastructure::driven::persistence::{InMemoryLedgerStore, JsonFileLedgerStore};
use crate::infrastructure::driven::render::SyntheticSceneRenderer;
use crate::infrastructure::driven::responder::ScriptedResponder;
use crate::infrastructure::{AppState, Settings};

/// Wire adapters into the application services. The live clock is created
/// stopped; the caller decides when it starts.
pub async fn build_state(settings: Settings) -> Result<AppState> {
    settings.validate()?;

    let store: Arc<dyn LedgerStore> = if settings.storage.ephemeral {
        info!("ledger is ephemeral, nothing will be written to disk");
        Arc::new(InMemoryLedgerStore::new())
    } else {
        let path = settings.storage.ledger_path();
        info!(path = %path.display(), "ledger file");
        Arc::new(JsonFileLedgerStore::new(path))
    };
    let ledger = Arc::new(SessionLedger::open(store).await);

    let stream = &settings.stream;
    let hub = Arc::new(StreamHub::new(stream.observer_queue, stream.stale_after()));
    let renderer: Arc<dyn FrameRenderer> =
        Arc::new(SyntheticSceneRenderer::new(stream.width, stream.height));

    let clock = match stream.mode {
        StreamMode::Live => Some(Arc::new(FrameClock::new(
            stream.frame_rate,
            Arc::clone(&renderer),
            Arc::clone(&hub),
        ))),
        StreamMode::Playback => None,
    };

    let responder: Arc<dyn RobotResponder> = Arc::new(ScriptedResponder::new(
        Duration::from_millis(settings.interaction.response_delay_ms),
    ));
    let exporter: Arc<dyn DatasetExporter> =
        Arc::new(JsonDatasetExporter::new(settings.storage.exports_dir()));

    let commands = Arc::new(IssueCommandHandler::new(
        Arc::clone(&ledger),
        Arc::clone(&hub),
        responder,
    ));
    let exports = Arc::new(ExportDatasetHandler::new(Arc::clone(&ledger), exporter));

    Ok(AppState {
        settings: Arc::new(settings),
        ledger,
        hub,
        clock,
        renderer,
        commands,
        exports,
    })
}
