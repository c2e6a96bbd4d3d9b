//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{EngineConfig, EngineSettings, ZonesConfig};

/// Loads and provides access to the engine configuration.
///
/// The configuration is read once at process start and is immutable
/// afterwards; per-zone cost models are merged with the defaults during
/// loading.
///
/// # Directory Structure
///
/// ```text
/// config/precast/
/// ├── engine.yaml   # Server, database, pricing defaults, default cost model
/// └── zones.yaml    # Optional per-zone cost model overrides
/// ```
///
/// # Example
///
/// ```no_run
/// use precast_pricing::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/precast").unwrap();
/// println!("Listening on {}", loader.config().server().bind_address);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` on success, or an error if:
    /// - `engine.yaml` is missing (`ConfigNotFound`)
    /// - any present file contains invalid YAML (`ConfigParseError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let settings = Self::load_yaml::<EngineSettings>(&path.join("engine.yaml"))?;

        let zones_path = path.join("zones.yaml");
        let zones = if zones_path.exists() {
            Self::load_yaml::<ZonesConfig>(&zones_path)?
        } else {
            ZonesConfig::default()
        };

        Ok(Self {
            config: EngineConfig::new(settings, zones),
        })
    }

    /// Wraps an already-built configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the loader, returning the configuration.
    pub fn into_config(self) -> EngineConfig {
        self.config
    }
}
