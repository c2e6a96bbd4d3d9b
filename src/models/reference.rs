//! Reference data owned by external collaborators.
//!
//! Pieces, materials and zones are maintained elsewhere (piece, material and
//! zone CRUD). The engine only reads them: piece geometry drives process and
//! labor cost, material identity backs the BOM, and zone existence guards
//! every zone-scoped operation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A raw material consumed by pieces (cement, rebar, aggregate, ...).
///
/// # Example
///
/// ```
/// use precast_pricing::models::Material;
///
/// let material = Material {
///     id: "CEM-I".to_string(),
///     name: "Cement CEM I 52.5".to_string(),
///     unit: "kg".to_string(),
///     category: "binder".to_string(),
/// };
/// assert_eq!(material.unit, "kg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    /// Unique identifier for the material.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Unit of measure the BOM quantities and prices refer to.
    pub unit: String,
    /// Category used for filtering (e.g. "binder", "steel").
    #[serde(default)]
    pub category: String,
}

/// A production/pricing region associated with a plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique identifier for the zone.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

/// A precast piece with the static geometry used for process and labor cost.
///
/// # Example
///
/// ```
/// use precast_pricing::models::Piece;
/// use rust_decimal::Decimal;
///
/// let piece = Piece {
///     id: "BEAM-12".to_string(),
///     name: "Prestressed beam 12m".to_string(),
///     kg_steel_per_unit: Some(Decimal::new(850, 0)),
///     m3_concrete_per_unit: Some(Decimal::new(42, 1)),
///     ton_weight_per_unit: Some(Decimal::new(105, 1)),
/// };
/// assert!(!piece.is_missing_geometry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    /// Unique identifier for the piece.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Reinforcing steel per unit, in kilograms.
    #[serde(default)]
    pub kg_steel_per_unit: Option<Decimal>,
    /// Concrete volume per unit, in cubic metres.
    #[serde(default)]
    pub m3_concrete_per_unit: Option<Decimal>,
    /// Finished weight per unit, in metric tons.
    #[serde(default)]
    pub ton_weight_per_unit: Option<Decimal>,
}

impl Piece {
    /// Steel per unit, treating an unset value as zero.
    pub fn kg_steel(&self) -> Decimal {
        self.kg_steel_per_unit.unwrap_or(Decimal::ZERO)
    }

    /// Concrete per unit, treating an unset value as zero.
    pub fn m3_concrete(&self) -> Decimal {
        self.m3_concrete_per_unit.unwrap_or(Decimal::ZERO)
    }

    /// Weight per unit, treating an unset value as zero.
    pub fn ton_weight(&self) -> Decimal {
        self.ton_weight_per_unit.unwrap_or(Decimal::ZERO)
    }

    /// Returns true when there is no geometry to derive process or labor cost
    /// from: steel, concrete and weight are all zero or unset.
    pub fn is_missing_geometry(&self) -> bool {
        self.kg_steel().is_zero() && self.m3_concrete().is_zero() && self.ton_weight().is_zero()
    }
}
