//! Configuration module for calcscope.
//!
//! Analysis thresholds and documentation-link settings, loaded from TOML.

mod settings;

pub use settings::{
    AnalysisSettings, DocsSettings, Settings, SettingsError, SettingsResult, CONFIG_ENV_VAR,
};
