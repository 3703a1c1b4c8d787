//! Lab configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Top-level configuration for a lab session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Directory holding saved progress
    pub store_path: PathBuf,

    /// Seed for the synthetic-duration and token generator.
    /// `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Simulated interaction latency
    pub latency: LatencyConfig,

    /// Trace recorder settings
    pub recorder: RecorderConfig,

    /// Hint/validation collaborator
    pub mentor: MentorConfig,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            store_path: crate::default_store_path(),
            seed: None,
            latency: LatencyConfig::default(),
            recorder: RecorderConfig::default(),
            mentor: MentorConfig::default(),
        }
    }
}

/// Fixed pauses inserted after simulated interactions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Page load after `goto`
    pub navigate_ms: u64,

    /// Click, fill, select
    pub interaction_ms: u64,

    /// Drag and drop
    pub drag_ms: u64,

    /// File upload
    pub upload_ms: u64,

    /// Pause before the first statement of a run
    pub warmup_ms: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            navigate_ms: 500,
            interaction_ms: 300,
            drag_ms: 600,
            upload_ms: 500,
            warmup_ms: 800,
        }
    }
}

impl LatencyConfig {
    /// All pauses set to zero
    pub fn instant() -> Self {
        Self {
            navigate_ms: 0,
            interaction_ms: 0,
            drag_ms: 0,
            upload_ms: 0,
            warmup_ms: 0,
        }
    }

    pub fn navigate(&self) -> Duration {
        Duration::from_millis(self.navigate_ms)
    }

    pub fn interaction(&self) -> Duration {
        Duration::from_millis(self.interaction_ms)
    }

    pub fn drag(&self) -> Duration {
        Duration::from_millis(self.drag_ms)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_millis(self.upload_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }
}

/// Synthetic step durations are drawn from `min..min + spread`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub min_duration_ms: u64,
    pub duration_spread_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 20,
            duration_spread_ms: 50,
        }
    }
}

/// Remote hint/validation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MentorConfig {
    /// Base URL of the service; offline when unset
    pub endpoint: Option<String>,

    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

impl LabConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.recorder.duration_spread_ms == 0 {
            return Err(Error::InvalidConfig(
                "recorder.duration_spread_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(endpoint) = &self.mentor.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(Error::InvalidConfig(format!(
                    "mentor.endpoint must be an http(s) URL, got {}",
                    endpoint
                )));
            }
        }
        Ok(())
    }

    /// Get the progress file path
    pub fn progress_path(&self) -> PathBuf {
        self.store_path.join("progress.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LabConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.latency.navigate_ms, 500);
        assert_eq!(config.recorder.min_duration_ms, 20);
        assert!(config.mentor.endpoint.is_none());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.toml");
        std::fs::write(&path, "seed = 7\n\n[latency]\ninteraction_ms = 10\n").unwrap();

        let config = LabConfig::load(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.latency.interaction_ms, 10);
        assert_eq!(config.latency.navigate_ms, 500);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lab.toml");
        let mut config = LabConfig::default();
        config.mentor.endpoint = Some("http://127.0.0.1:8099".to_string());
        config.save(&path).unwrap();

        let loaded = LabConfig::load(&path).unwrap();
        assert_eq!(loaded.mentor.endpoint.as_deref(), Some("http://127.0.0.1:8099"));
    }

    #[test]
    fn test_rejects_non_http_endpoint() {
        let mut config = LabConfig::default();
        config.mentor.endpoint = Some("ftp://mentor".to_string());
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
