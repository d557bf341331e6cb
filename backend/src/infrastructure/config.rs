//! Layered settings: built-in defaults, then an optional `recorder.toml`,
//! then `RECORDER__SECTION__KEY` environment variables (highest wins).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use shared::StreamMode;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub stream: StreamSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub interaction: InteractionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    pub mode: StreamMode,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    /// Length of the per-connection sequence in playback mode
    pub playback_frames: usize,
    /// Per-observer queue depth, in frames
    pub observer_queue: usize,
    pub stale_after_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            mode: StreamMode::Live,
            frame_rate: 10,
            width: 320,
            height: 240,
            playback_frames: 300,
            observer_queue: 64,
            stale_after_ms: 5_000,
        }
    }
}

impl StreamSettings {
    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    /// Keep the ledger in memory only
    pub ephemeral: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ledger_file: "ledger.json".to_string(),
            ephemeral: false,
        }
    }
}

impl StorageSettings {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Simulated think time of the robot before it answers
    pub response_delay_ms: u64,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            response_delay_ms: 800,
        }
    }
}

impl Settings {
    /// Load `.env`, then layer the config file and environment over defaults
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("Failed to load .env file");
            }
        }

        let config_file =
            std::env::var("RECORDER_CONFIG").unwrap_or_else(|_| "recorder".to_string());

        let settings: Settings = config::Config::builder()
            .add_source(config::File::with_name(&config_file).required(false))
            .add_source(
                config::Environment::with_prefix("RECORDER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let stream = &self.stream;
        if !(1..=60).contains(&stream.frame_rate) {
            bail!("stream.frame_rate must be between 1 and 60");
        }
        if stream.width == 0 || stream.height == 0 {
            bail!("stream.width and stream.height must be non-zero");
        }
        if stream.observer_queue == 0 {
            bail!("stream.observer_queue must be at least 1");
        }
        if stream.playback_frames == 0 {
            bail!("stream.playback_frames must be at least 1");
        }
        if self.storage.ledger_file.trim().is_empty() {
            bail!("storage.ledger_file must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.stream.mode, StreamMode::Live);
        assert_eq!(settings.storage.ledger_path(), PathBuf::from("data/ledger.json"));
    }

    #[test]
    fn test_frame_rate_bounds() {
        let mut settings = Settings::default();
        settings.stream.frame_rate = 0;
        assert!(settings.validate().is_err());
        settings.stream.frame_rate = 61;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from_str(
                "[stream]\nmode = \"playback\"\nframe_rate = 30\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.stream.mode, StreamMode::Playback);
        assert_eq!(settings.stream.frame_rate, 30);
        assert_eq!(settings.stream.observer_queue, 64);
        assert_eq!(settings.server.bind_addr.port(), 8080);
    }
}
