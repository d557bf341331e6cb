use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::debug;

use crate::application::ports::RobotResponder;

/// Keyword-triggered replies, checked in order; first match wins
const SCRIPT: &[(&[&str], &[&str])] = &[
    (
        &["pick", "grab", "grasp"],
        &[
            "Moving gripper to the target, closing now.",
            "Target located, attempting grasp.",
        ],
    ),
    (
        &["place", "put", "drop"],
        &[
            "Lowering the object to the placement area.",
            "Releasing the object.",
        ],
    ),
    (
        &["stop", "halt", "freeze"],
        &["Stopping all motion.", "Halted."],
    ),
    (
        &["left", "right", "forward", "back", "up", "down", "move"],
        &["Adjusting position.", "Moving as requested."],
    ),
];

const FALLBACK: &[&str] = &[
    "Understood.",
    "Working on it.",
    "Command received, executing.",
];

/// Stand-in robot that answers after a short think time
pub struct ScriptedResponder {
    delay: Duration,
}

impl ScriptedResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Candidate replies for a command
    pub fn candidates(command: &str) -> &'static [&'static str] {
        let command = command.to_lowercase();
        SCRIPT
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| command.contains(k)))
            .map(|(_, replies)| *replies)
            .unwrap_or(FALLBACK)
    }
}

#[async_trait]
impl RobotResponder for ScriptedResponder {
    async fn respond(&self, command: &str) -> String {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = Self::candidates(command)
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Understood.");
        debug!(command, reply, "robot replied");
        reply.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_select_script_entry() {
        assert!(ScriptedResponder::candidates("Please PICK up the cube")
            .contains(&"Target located, attempting grasp."));
        assert!(ScriptedResponder::candidates("halt").contains(&"Halted."));
        assert_eq!(ScriptedResponder::candidates("sing a song"), FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_waits_for_delay() {
        let responder = ScriptedResponder::new(Duration::from_millis(800));
        let started = tokio::time::Instant::now();

        let reply = responder.respond("grab it").await;

        assert!(started.elapsed() >= Duration::from_millis(800));
        assert!(ScriptedResponder::candidates("grab it").contains(&reply.as_str()));
    }
}
