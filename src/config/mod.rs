//! Configuration loading and management for the pricing engine.
//!
//! This module loads the engine configuration from YAML files: server and
//! database settings, pricing defaults, the default cost model and per-zone
//! cost model overrides.
//!
//! # Example
//!
//! ```no_run
//! use precast_pricing::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/precast").unwrap();
//! println!("Database: {}", config.config().database().path);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    CostModel, CostModelOverrides, DatabaseConfig, EngineConfig, EngineSettings, PricingDefaults,
    ServerConfig, ZonesConfig, merge_with_defaults,
};
