//! Layered settings for the binaries.
//!
//! Sources, highest priority first:
//! 1. `WBS_TIMELINE_*` environment variables
//! 2. an explicit TOML file, or `wbs-timeline.toml` in the working directory
//! 3. built-in defaults

use crate::timeline::DEFAULT_UNIT_WIDTH;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOCAL_CONFIG_FILE: &str = "wbs-timeline.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        Self::Figment(Box::new(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WbsConfig {
    /// SQLite file holding projects, tasks and todos.
    pub database_path: PathBuf,
    /// Horizontal pixels per day on the timeline.
    pub unit_width: f32,
    /// Listen address for the HTTP API.
    pub http_addr: String,
}

impl Default for WbsConfig {
    fn default() -> Self {
        let database_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wbs-timeline")
            .join("data.db");
        Self {
            database_path,
            unit_width: DEFAULT_UNIT_WIDTH,
            http_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl WbsConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads with `file` standing in for the working-directory TOML.
    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(file).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        match file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(LOCAL_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }
        figment.merge(Env::prefixed("WBS_TIMELINE_"))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.unit_width.is_finite() || self.unit_width <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "unit_width".into(),
                reason: format!("must be a positive number (got {})", self.unit_width),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_without_files() {
        let config: WbsConfig = Figment::from(Serialized::defaults(WbsConfig::default()))
            .extract()
            .expect("defaults extract");
        assert_eq!(config.unit_width, DEFAULT_UNIT_WIDTH);
        assert!(config.database_path.ends_with("data.db"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config: WbsConfig = Figment::from(Serialized::defaults(WbsConfig::default()))
            .merge(Toml::string("unit_width = 12.0\nhttp_addr = \"0.0.0.0:8080\""))
            .extract()
            .expect("toml extract");
        assert_eq!(config.unit_width, 12.0);
        assert_eq!(config.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn non_positive_unit_width_is_rejected() {
        let config = WbsConfig {
            unit_width: 0.0,
            ..WbsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
