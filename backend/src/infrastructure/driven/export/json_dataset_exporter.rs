use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::application::export::{DatasetManifest, SessionDataset};
use crate::application::ports::DatasetExporter;
use crate::domain::errors::StorageError;
use crate::infrastructure::driven::atomic_file::write_atomic;

pub const MANIFEST_FILE: &str = "dataset_manifest.json";

/// Writes datasets as pretty JSON files under one export directory
pub struct JsonDatasetExporter {
    root: PathBuf,
}

impl JsonDatasetExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_json<T: Serialize>(&self, file_name: String, value: &T) -> Result<PathBuf, StorageError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let path = self.root.join(file_name);
        let target = path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;
        Ok(path)
    }
}

#[async_trait]
impl DatasetExporter for JsonDatasetExporter {
    fn session_file_name(&self, dataset: &SessionDataset) -> String {
        format!("{}_huggingface.json", dataset.info.session_id)
    }

    async fn write_session(&self, dataset: &SessionDataset) -> Result<PathBuf, StorageError> {
        self.write_json(self.session_file_name(dataset), dataset).await
    }

    async fn write_manifest(&self, manifest: &DatasetManifest) -> Result<PathBuf, StorageError> {
        self.write_json(MANIFEST_FILE.to_string(), manifest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::ExportDatasetHandler;
    use crate::application::ledger::SessionLedger;
    use crate::domain::value_objects::{FrameId, Sender};
    use crate::infrastructure::driven::persistence::InMemoryLedgerStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_export_all_writes_sessions_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SessionLedger::new(Arc::new(InMemoryLedgerStore::new())));
        let session = ledger.create_session("Pick up the cube", json!({})).await.unwrap();
        let command = ledger
            .append_message(&session.id, Sender::Scientist, "pick up cube", Some(FrameId::new(3)))
            .await
            .unwrap();
        ledger
            .append_label(&session.id, &command.id, "success", json!(true))
            .await
            .unwrap();

        let exporter = Arc::new(JsonDatasetExporter::new(dir.path().join("exports")));
        let handler = ExportDatasetHandler::new(Arc::clone(&ledger), exporter);
        let result = handler.export_all().await.unwrap();

        assert_eq!(result.files.len(), 1);
        let written: SessionDataset =
            serde_json::from_slice(&std::fs::read(&result.files[0]).unwrap()).unwrap();
        assert_eq!(written.data[0].video_frame_id.as_deref(), Some("frame_3"));
        assert_eq!(written.data[0].labels[0].label_type, "success");

        let manifest_path = result.manifest.unwrap();
        assert!(manifest_path.ends_with(MANIFEST_FILE));
        let manifest: serde_json::Value =
            serde_json::from_slice(&std::fs::read(manifest_path).unwrap()).unwrap();
        assert_eq!(manifest["sessions"][0]["file"], format!("{}_huggingface.json", session.id));
        assert_eq!(manifest["statistics"]["total_labels"], 1);
    }
}
