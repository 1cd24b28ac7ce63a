//! Configuration file support for gymflow.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/gymflow/config.toml`.

use crate::session::SessionSettings;
use crate::{Error, Exercise, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub assistant: AssistantConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Session pacing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_inter_exercise_rest_seconds")]
    pub inter_exercise_rest_seconds: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inter_exercise_rest_seconds: default_inter_exercise_rest_seconds(),
        }
    }
}

/// Switches for the suggestion and recommendation helpers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_true")]
    pub suggestions_enabled: bool,

    #[serde(default = "default_true")]
    pub recommendations_enabled: bool,

    #[serde(default = "default_recommendation_latency_ms")]
    pub recommendation_latency_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            suggestions_enabled: true,
            recommendations_enabled: true,
            recommendation_latency_ms: default_recommendation_latency_ms(),
        }
    }
}

/// User-defined exercises added to the built-in catalog
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub custom: Vec<Exercise>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("gymflow")
}

fn default_inter_exercise_rest_seconds() -> u32 {
    60
}

fn default_recommendation_latency_ms() -> u64 {
    1500
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("gymflow").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for exercise in &self.catalog.custom {
            if exercise.reps == 0 {
                return Err(Error::Config(format!(
                    "Custom exercise '{}' must have at least one rep",
                    exercise.id
                )));
            }
        }
        Ok(())
    }

    /// Engine settings derived from this configuration
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            inter_exercise_rest_seconds: self.session.inter_exercise_rest_seconds,
            suggestions_enabled: self.assistant.suggestions_enabled,
            recommendations_enabled: self.assistant.recommendations_enabled,
            recommendation_latency: Duration::from_millis(
                self.assistant.recommendation_latency_ms,
            ),
        }
    }
}
