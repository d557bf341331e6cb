use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::application::export::{
    filter_by_labels, filter_by_sender, DatasetManifest, DatasetStatistics, ManifestEntry,
    SessionDataset,
};
use crate::application::ledger::SessionLedger;
use crate::application::ports::DatasetExporter;
use crate::domain::errors::LedgerError;
use crate::domain::value_objects::{Sender, SessionId};

/// Optional narrowing applied before computing statistics
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DatasetFilter {
    pub sender: Option<Sender>,
    /// Only labelled messages; `Some("")` keeps any label
    pub label_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportResult {
    pub files: Vec<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub statistics: DatasetStatistics,
}

/// Turns ledger snapshots into dataset files
pub struct ExportDatasetHandler {
    ledger: Arc<SessionLedger>,
    exporter: Arc<dyn DatasetExporter>,
}

impl ExportDatasetHandler {
    pub fn new(ledger: Arc<SessionLedger>, exporter: Arc<dyn DatasetExporter>) -> Self {
        Self { ledger, exporter }
    }

    pub async fn export_session(&self, session_id: &SessionId) -> Result<ExportResult, LedgerError> {
        let view = self.ledger.snapshot(session_id).await?;
        let dataset = SessionDataset::from(&view);
        let file = self.exporter.write_session(&dataset).await?;
        info!(session = %session_id, file = %file.display(), "session exported");

        Ok(ExportResult {
            files: vec![file],
            manifest: None,
            statistics: DatasetStatistics::compute(std::slice::from_ref(&dataset)),
        })
    }

    /// Export every session plus a manifest indexing them
    pub async fn export_all(&self) -> Result<ExportResult, LedgerError> {
        let datasets: Vec<SessionDataset> = self
            .ledger
            .snapshot_all()
            .await
            .iter()
            .map(SessionDataset::from)
            .collect();

        let mut files = Vec::with_capacity(datasets.len());
        let mut entries = Vec::with_capacity(datasets.len());
        for dataset in &datasets {
            files.push(self.exporter.write_session(dataset).await?);
            entries.push(ManifestEntry {
                session_id: dataset.info.session_id.clone(),
                objective: dataset.info.objective.clone(),
                status: dataset.info.status,
                message_count: dataset.info.stats.message_count,
                label_count: dataset.info.stats.label_count,
                file: self.exporter.session_file_name(dataset),
            });
        }

        let statistics = DatasetStatistics::compute(&datasets);
        let manifest = DatasetManifest {
            generated_at: Utc::now(),
            sessions: entries,
            statistics: statistics.clone(),
        };
        let manifest_path = self.exporter.write_manifest(&manifest).await?;
        info!(sessions = datasets.len(), manifest = %manifest_path.display(), "dataset exported");

        Ok(ExportResult {
            files,
            manifest: Some(manifest_path),
            statistics,
        })
    }

    pub async fn statistics(&self, filter: &DatasetFilter) -> DatasetStatistics {
        let mut datasets: Vec<SessionDataset> = self
            .ledger
            .snapshot_all()
            .await
            .iter()
            .map(SessionDataset::from)
            .collect();

        if let Some(sender) = filter.sender {
            datasets = filter_by_sender(&datasets, sender);
        }
        if let Some(kind) = &filter.label_type {
            let kind = (!kind.is_empty()).then_some(kind.as_str());
            datasets = filter_by_labels(&datasets, kind);
        }
        DatasetStatistics::compute(&datasets)
    }
}
