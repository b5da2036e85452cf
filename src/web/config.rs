use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::broadcast::DEFAULT_OBSERVER_QUEUE;
use crate::sos::DEFAULT_RADIUS_KM;
use crate::video::DEFAULT_VIEWER_QUEUE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub sos: SosConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Dashboard origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_stale_after", deserialize_with = "deserialize_duration")]
    pub stale_after: Duration,
    /// Personnel reports less accurate than this (metres) are discarded.
    #[serde(default = "default_max_accuracy")]
    pub max_accuracy_m: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
            max_accuracy_m: default_max_accuracy(),
        }
    }
}

fn default_stale_after() -> Duration {
    Duration::from_secs(90)
}

fn default_max_accuracy() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SosConfig {
    #[serde(default = "default_radius")]
    pub radius_km: f64,
}

impl Default for SosConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius(),
        }
    }
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS_KM
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_observer_queue")]
    pub observer_queue: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            observer_queue: default_observer_queue(),
        }
    }
}

fn default_observer_queue() -> usize {
    DEFAULT_OBSERVER_QUEUE
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    #[serde(default = "default_viewer_queue")]
    pub viewer_queue: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            viewer_queue: default_viewer_queue(),
        }
    }
}

fn default_viewer_queue() -> usize {
    DEFAULT_VIEWER_QUEUE
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Folder for persisted presence and alerts. Unset keeps everything in memory.
    pub base_folder: Option<PathBuf>,
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.presence.stale_after.is_zero() {
            return Err(ConfigError::Invalid("presence.stale_after must be positive".into()));
        }
        if !(self.sos.radius_km.is_finite() && self.sos.radius_km >= 0.0) {
            return Err(ConfigError::Invalid("sos.radius_km must be >= 0".into()));
        }
        if !(self.presence.max_accuracy_m.is_finite() && self.presence.max_accuracy_m > 0.0) {
            return Err(ConfigError::Invalid("presence.max_accuracy_m must be positive".into()));
        }
        if self.broadcast.observer_queue == 0 || self.video.viewer_queue == 0 {
            return Err(ConfigError::Invalid("queue sizes must be at least 1".into()));
        }
        Ok(())
    }

    /// Staleness threshold as a signed duration for timestamp arithmetic.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.presence.stale_after)
            .unwrap_or(crate::presence::DEFAULT_STALE_AFTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8000");
        assert_eq!(config.presence.stale_after, Duration::from_secs(90));
        assert_eq!(config.sos.radius_km, 2.0);
        assert!(config.storage.base_folder.is_none());
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
web:
  bind: "127.0.0.1:9000"
  allowed_origins:
    - "http://localhost:5500"
presence:
  stale_after: 2m
  max_accuracy_m: 25
sos:
  radius_km: 5.5
broadcast:
  observer_queue: 64
video:
  viewer_queue: 4
storage:
  base_folder: /var/lib/fieldlink
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.web.bind, "127.0.0.1:9000");
        assert_eq!(config.web.allowed_origins.len(), 1);
        assert_eq!(config.presence.stale_after, Duration::from_secs(120));
        assert_eq!(config.stale_after(), chrono::Duration::seconds(120));
        assert_eq!(config.presence.max_accuracy_m, 25.0);
        assert_eq!(config.sos.radius_km, 5.5);
        assert_eq!(config.broadcast.observer_queue, 64);
        assert_eq!(config.video.viewer_queue, 4);
        assert_eq!(
            config.storage.base_folder,
            Some(PathBuf::from("/var/lib/fieldlink"))
        );
    }

    #[test]
    fn rejects_bad_duration() {
        let err = Config::from_str("presence:\n  stale_after: soon\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn rejects_zero_queue() {
        let err = Config::from_str("video:\n  viewer_queue: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
