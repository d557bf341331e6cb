use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::aggregates::{SessionStats, SessionView};
use crate::domain::value_objects::{Sender, SessionId, SessionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetLabel {
    pub label_type: String,
    pub label_data: serde_json::Value,
}

/// One training example: a message with its frame reference and labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    pub command: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub video_frame_id: Option<String>,
    pub labels: Vec<DatasetLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub session_id: SessionId,
    pub objective: String,
    pub metadata: serde_json::Value,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub stats: SessionStats,
}

/// Export unit for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDataset {
    pub info: DatasetInfo,
    pub data: Vec<DatasetRecord>,
}

impl From<&SessionView> for SessionDataset {
    fn from(view: &SessionView) -> Self {
        let data = view
            .messages
            .iter()
            .map(|entry| DatasetRecord {
                id: entry.message.id.to_string(),
                command: entry.message.content.clone(),
                sender: entry.message.sender,
                timestamp: entry.message.timestamp,
                video_frame_id: entry.message.frame_id.map(|id| id.to_string()),
                labels: entry
                    .labels
                    .iter()
                    .map(|label| DatasetLabel {
                        label_type: label.kind.clone(),
                        label_data: label.payload.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            info: DatasetInfo {
                session_id: view.id.clone(),
                objective: view.objective.clone(),
                metadata: view.metadata.clone(),
                status: view.status,
                created_at: view.created_at,
                ended_at: view.ended_at,
                stats: view.stats.clone(),
            },
            data,
        }
    }
}

/// Aggregate figures over a set of exported sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub total_labels: usize,
    pub messages_by_sender: BTreeMap<String, usize>,
    pub avg_messages_per_session: f64,
    pub avg_labels_per_message: f64,
}

impl DatasetStatistics {
    pub fn compute(datasets: &[SessionDataset]) -> Self {
        let mut messages_by_sender = BTreeMap::new();
        let mut total_messages = 0;
        let mut total_labels = 0;

        for dataset in datasets {
            for record in &dataset.data {
                *messages_by_sender
                    .entry(record.sender.as_str().to_string())
                    .or_insert(0) += 1;
                total_labels += record.labels.len();
                total_messages += 1;
            }
        }

        let avg_messages_per_session = if datasets.is_empty() {
            0.0
        } else {
            total_messages as f64 / datasets.len() as f64
        };
        let avg_labels_per_message = if total_messages == 0 {
            0.0
        } else {
            total_labels as f64 / total_messages as f64
        };

        Self {
            total_sessions: datasets.len(),
            total_messages,
            total_labels,
            messages_by_sender,
            avg_messages_per_session,
            avg_labels_per_message,
        }
    }
}

/// Keep only records from `sender`; sessions left empty are dropped
pub fn filter_by_sender(datasets: &[SessionDataset], sender: Sender) -> Vec<SessionDataset> {
    retain_records(datasets, |record| record.sender == sender)
}

/// Keep only labelled records, optionally carrying a label of `label_type`
pub fn filter_by_labels(datasets: &[SessionDataset], label_type: Option<&str>) -> Vec<SessionDataset> {
    retain_records(datasets, |record| match label_type {
        None => !record.labels.is_empty(),
        Some(kind) => record.labels.iter().any(|label| label.label_type == kind),
    })
}

fn retain_records<F>(datasets: &[SessionDataset], keep: F) -> Vec<SessionDataset>
where
    F: Fn(&DatasetRecord) -> bool,
{
    datasets
        .iter()
        .filter_map(|dataset| {
            let data: Vec<_> = dataset.data.iter().filter(|r| keep(r)).cloned().collect();
            (!data.is_empty()).then(|| SessionDataset {
                info: dataset.info.clone(),
                data,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub session_id: SessionId,
    pub objective: String,
    pub status: SessionStatus,
    pub message_count: usize,
    pub label_count: usize,
    pub file: String,
}

/// Index of every exported session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub generated_at: DateTime<Utc>,
    pub sessions: Vec<ManifestEntry>,
    pub statistics: DatasetStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Session;
    use crate::domain::value_objects::FrameId;
    use serde_json::json;

    fn recorded_session() -> Session {
        let mut session = Session::new("Pick up the cube", json!({"rig": "sim"}));
        let command = session
            .append_message(Sender::Scientist, "pick up cube", Some(FrameId::new(4)))
            .unwrap();
        let reply = session
            .append_message(Sender::Robot, "Picking up the cube.", Some(FrameId::new(6)))
            .unwrap();
        session
            .append_message(Sender::Scientist, "thanks", None)
            .unwrap();
        session.append_label(&reply.id, "success", json!(true)).unwrap();
        session.append_label(&command.id, "intent", json!("grasp")).unwrap();
        session
    }

    #[test]
    fn test_records_follow_message_order_and_carry_labels() {
        let dataset = SessionDataset::from(&recorded_session().view());

        assert_eq!(dataset.data.len(), 3);
        assert_eq!(dataset.data[0].command, "pick up cube");
        assert_eq!(dataset.data[0].video_frame_id.as_deref(), Some("frame_4"));
        assert_eq!(dataset.data[1].labels[0].label_type, "success");
        assert_eq!(dataset.data[2].video_frame_id, None);
        assert_eq!(dataset.info.objective, "Pick up the cube");
    }

    #[test]
    fn test_statistics() {
        let datasets = vec![
            SessionDataset::from(&recorded_session().view()),
            SessionDataset::from(&Session::new("empty", json!({})).view()),
        ];

        let stats = DatasetStatistics::compute(&datasets);
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.total_labels, 2);
        assert_eq!(stats.messages_by_sender["scientist"], 2);
        assert_eq!(stats.messages_by_sender["robot"], 1);
        assert!((stats.avg_messages_per_session - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_statistics_of_nothing_are_zero() {
        let stats = DatasetStatistics::compute(&[]);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.avg_messages_per_session, 0.0);
        assert_eq!(stats.avg_labels_per_message, 0.0);
    }

    #[test]
    fn test_filters() {
        let datasets = vec![SessionDataset::from(&recorded_session().view())];

        let robot = filter_by_sender(&datasets, Sender::Robot);
        assert_eq!(robot[0].data.len(), 1);

        let labelled = filter_by_labels(&datasets, None);
        assert_eq!(labelled[0].data.len(), 2);

        let intents = filter_by_labels(&datasets, Some("intent"));
        assert_eq!(intents[0].data[0].command, "pick up cube");

        assert!(filter_by_labels(&datasets, Some("failure")).is_empty());
    }
}
