//! Material price listing filters and CSV import outcomes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::MaterialZonePrice;

/// Filter for listing material prices.
///
/// Every field is optional; unset fields do not constrain the result. The
/// value is interpreted by a single query builder so the filter logic can
/// be tested without a database.
///
/// # Example
///
/// ```
/// use precast_pricing::models::MaterialPriceQuery;
///
/// let query: MaterialPriceQuery =
///     serde_json::from_str(r#"{"category": "steel", "zone_id": "Z1"}"#).unwrap();
/// assert!(query.active_only);
/// assert!(query.search.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialPriceQuery {
    /// Case-insensitive substring of the material id or name.
    #[serde(default)]
    pub search: Option<String>,
    /// Exact material category.
    #[serde(default)]
    pub category: Option<String>,
    /// Exact zone.
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Exact material.
    #[serde(default)]
    pub material_id: Option<String>,
    /// Keep only rows valid on this date, and resolve one row per
    /// (material, zone).
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    /// Skip deactivated rows.
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

impl Default for MaterialPriceQuery {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            zone_id: None,
            material_id: None,
            as_of: None,
            active_only: true,
        }
    }
}

/// A material price row joined with its material's attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialPriceListing {
    /// The price row.
    #[serde(flatten)]
    pub price: MaterialZonePrice,
    /// Material name.
    pub material_name: String,
    /// Material unit of measure.
    pub unit: String,
    /// Material category.
    pub category: String,
}

/// Outcome of one imported CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportRowStatus {
    /// The row was valid (and applied, if the batch was applied).
    Ok,
    /// The row was rejected.
    Failed,
}

/// Per-row result of a material price import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowOutcome {
    /// 1-based data row number (the header is not counted).
    pub row: usize,
    /// Material id as read from the row.
    pub material_id: String,
    /// Parsed price, when parseable.
    pub price: Option<Decimal>,
    /// Row status.
    pub status: ImportRowStatus,
    /// Why the row was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of a material price import for a (zone, month).
///
/// The batch is all-or-nothing: `applied` is false whenever any row failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// The zone imported into.
    pub zone_id: String,
    /// First day of the imported month; every row takes effect from it.
    pub month: NaiveDate,
    /// Whether the rows were written.
    pub applied: bool,
    /// Number of data rows read.
    pub total_rows: usize,
    /// Rows that passed validation.
    pub succeeded: usize,
    /// Rows that failed validation.
    pub failed: usize,
    /// Per-row outcomes, in file order.
    pub rows: Vec<ImportRowOutcome>,
}
