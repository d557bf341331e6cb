use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::export::{DatasetManifest, SessionDataset};
use crate::domain::errors::StorageError;

/// Port for writing exported datasets to their downstream location
#[async_trait]
pub trait DatasetExporter: Send + Sync {
    /// File name the session dataset is written under
    fn session_file_name(&self, dataset: &SessionDataset) -> String;

    async fn write_session(&self, dataset: &SessionDataset) -> Result<PathBuf, StorageError>;
    async fn write_manifest(&self, manifest: &DatasetManifest) -> Result<PathBuf, StorageError>;
}
