//! Configuration types for the pricing engine.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files. Every section has a
//! built-in default so partial files are accepted.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the API listens on.
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Ledger database settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/precast.db".to_string(),
        }
    }
}

/// Engine-wide pricing defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PricingDefaults {
    /// History rows returned when the caller gives no limit.
    pub history_limit: usize,
    /// Largest history limit a caller may ask for.
    pub max_history_limit: usize,
    /// Waste factors above this value raise a formula warning.
    pub high_waste_factor: Decimal,
    /// Acting user recorded when a request carries no identity.
    pub default_user: String,
}

impl Default for PricingDefaults {
    fn default() -> Self {
        Self {
            history_limit: 12,
            max_history_limit: 100,
            high_waste_factor: Decimal::new(5, 1),
            default_user: "system".to_string(),
        }
    }
}

/// Which per-ton terms make up process cost, and how totals are rounded.
///
/// Energy is always part of process cost.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Apply `overhead_factory_per_ton`.
    pub include_overhead_factory: bool,
    /// Apply `overhead_company_per_ton`.
    pub include_overhead_company: bool,
    /// Apply `engineering_per_ton`.
    pub include_engineering: bool,
    /// Apply `profit_per_ton`.
    pub include_profit: bool,
    /// Decimal places of the breakdown total.
    pub rounding_scale: u32,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            include_overhead_factory: true,
            include_overhead_company: true,
            include_engineering: true,
            include_profit: true,
            rounding_scale: 2,
        }
    }
}

/// A stored, partial cost model for one zone. Unset fields fall back to
/// the engine default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CostModelOverrides {
    /// Override for [`CostModel::include_overhead_factory`].
    pub include_overhead_factory: Option<bool>,
    /// Override for [`CostModel::include_overhead_company`].
    pub include_overhead_company: Option<bool>,
    /// Override for [`CostModel::include_engineering`].
    pub include_engineering: Option<bool>,
    /// Override for [`CostModel::include_profit`].
    pub include_profit: Option<bool>,
    /// Override for [`CostModel::rounding_scale`].
    pub rounding_scale: Option<u32>,
}

/// Combines a stored partial cost model with the defaults into a new value.
///
/// Neither input is modified.
///
/// # Example
///
/// ```
/// use precast_pricing::config::{merge_with_defaults, CostModel, CostModelOverrides};
///
/// let defaults = CostModel::default();
/// let stored = CostModelOverrides {
///     include_profit: Some(false),
///     ..CostModelOverrides::default()
/// };
/// let merged = merge_with_defaults(&stored, &defaults);
/// assert!(!merged.include_profit);
/// assert!(merged.include_engineering);
/// assert!(defaults.include_profit);
/// ```
pub fn merge_with_defaults(stored: &CostModelOverrides, defaults: &CostModel) -> CostModel {
    CostModel {
        include_overhead_factory: stored
            .include_overhead_factory
            .unwrap_or(defaults.include_overhead_factory),
        include_overhead_company: stored
            .include_overhead_company
            .unwrap_or(defaults.include_overhead_company),
        include_engineering: stored
            .include_engineering
            .unwrap_or(defaults.include_engineering),
        include_profit: stored.include_profit.unwrap_or(defaults.include_profit),
        rounding_scale: stored.rounding_scale.unwrap_or(defaults.rounding_scale),
    }
}

/// Structure of `engine.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Pricing defaults.
    pub pricing: PricingDefaults,
    /// Default cost model.
    pub cost_model: CostModel,
}

/// Structure of `zones.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ZonesConfig {
    /// Map of zone id to its stored cost model overrides.
    pub zones: HashMap<String, CostModelOverrides>,
}

/// The complete, immutable engine configuration.
///
/// Zone cost models are merged once at construction; lookups never mutate.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    settings: EngineSettings,
    zone_cost_models: HashMap<String, CostModel>,
}

impl EngineConfig {
    /// Creates a configuration from the engine settings and zone overrides.
    pub fn new(settings: EngineSettings, zones: ZonesConfig) -> Self {
        let zone_cost_models = zones
            .zones
            .iter()
            .map(|(zone_id, stored)| {
                (
                    zone_id.clone(),
                    merge_with_defaults(stored, &settings.cost_model),
                )
            })
            .collect();
        Self {
            settings,
            zone_cost_models,
        }
    }

    /// Returns the server settings.
    pub fn server(&self) -> &ServerConfig {
        &self.settings.server
    }

    /// Returns the database settings.
    pub fn database(&self) -> &DatabaseConfig {
        &self.settings.database
    }

    /// Returns the pricing defaults.
    pub fn pricing(&self) -> &PricingDefaults {
        &self.settings.pricing
    }

    /// Returns the default cost model.
    pub fn default_cost_model(&self) -> &CostModel {
        &self.settings.cost_model
    }

    /// Returns the cost model of a zone, or the default when the zone has no
    /// stored overrides.
    pub fn cost_model_for(&self, zone_id: &str) -> &CostModel {
        self.zone_cost_models
            .get(zone_id)
            .unwrap_or(&self.settings.cost_model)
    }
}
