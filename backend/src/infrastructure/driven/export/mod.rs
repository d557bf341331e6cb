pub mod json_dataset_exporter;

pub use json_dataset_exporter::{JsonDatasetExporter, MANIFEST_FILE};
