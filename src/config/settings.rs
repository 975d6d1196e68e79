//! TOML-based configuration for calcscope.
//!
//! Example configuration:
//! ```toml
//! [analysis]
//! high_cost_threshold = 150
//! high_cost_request_limit = 2
//! long_duration_sigma = 3.0
//! dependency_mode = "exhaustive"
//!
//! [docs]
//! enabled = true
//! base_url = "https://docs.aws.amazon.com/quicksight/latest/user/"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{DocLinkResolver, NoDocLinks, StaticDocLinks, DEFAULT_DOCS_BASE_URL};
use crate::visitor::DependencyMode;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CALCSCOPE_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Cost and anomaly thresholds.
    pub analysis: AnalysisSettings,

    /// Function documentation links.
    pub docs: DocsSettings,
}

/// Thresholds used while building the hierarchy.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// A request whose total expression cost exceeds this is tagged `highCost`.
    pub high_cost_threshold: u64,

    /// A subtree is tagged `highCost` when it holds more high-cost requests than this.
    pub high_cost_request_limit: u32,

    /// Outlier rule: duration > mean + sigma * stddev.
    pub long_duration_sigma: f64,

    /// Whether repeated references are recorded every time or once.
    pub dependency_mode: DependencyMode,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            high_cost_threshold: 150,
            high_cost_request_limit: 2,
            long_duration_sigma: 3.0,
            dependency_mode: DependencyMode::default(),
        }
    }
}

/// Documentation link settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DocsSettings {
    /// Attach documentation links to function dependencies.
    pub enabled: bool,

    /// Base URL of the function reference.
    pub base_url: String,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_DOCS_BASE_URL.to_string(),
        }
    }
}

impl DocsSettings {
    /// Build the resolver these settings describe.
    pub fn resolver(&self) -> Box<dyn DocLinkResolver> {
        if self.enabled {
            Box::new(StaticDocLinks::new(self.base_url.clone()))
        } else {
            Box::new(NoDocLinks)
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SettingsResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CALCSCOPE_CONFIG`
    /// 2. `./calcscope.toml`
    /// 3. `~/.config/calcscope/config.toml`
    pub fn load() -> SettingsResult<Self> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("calcscope.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("calcscope").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject values the analysis cannot work with.
    pub fn validate(&self) -> SettingsResult<()> {
        let sigma = self.analysis.long_duration_sigma;
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(SettingsError::InvalidConfig(format!(
                "analysis.long_duration_sigma must be a non-negative number, got {sigma}"
            )));
        }
        if self.docs.enabled && self.docs.base_url.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "docs.base_url must not be empty when docs are enabled".to_string(),
            ));
        }
        Ok(())
    }
}
