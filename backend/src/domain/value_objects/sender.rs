use serde::{Deserialize, Serialize};
use std::fmt;

/// Who emitted a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Scientist,
    Robot,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Scientist => "scientist",
            Sender::Robot => "robot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
