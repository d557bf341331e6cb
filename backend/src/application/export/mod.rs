// Dataset export read models built from ledger snapshots

pub mod dataset;

pub use dataset::{
    filter_by_labels, filter_by_sender, DatasetInfo, DatasetLabel, DatasetManifest,
    DatasetRecord, DatasetStatistics, ManifestEntry, SessionDataset,
};
