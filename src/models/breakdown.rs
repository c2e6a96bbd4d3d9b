//! Cost breakdown models.
//!
//! A [`CostBreakdown`] is a read-only projection of the ledgers for one
//! (piece, zone, as-of date). Data gaps never abort it; they show up as
//! flags, `missing_prices` and human-readable warnings.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Warning code: a BOM material has no price as of the date.
pub const WARN_MISSING_MATERIAL_PRICE: &str = "MISSING_MATERIAL_PRICE";
/// Warning code: the previous month's process parameters were used.
pub const WARN_PROCESS_PARAMS_FALLBACK: &str = "PROCESS_PARAMS_FALLBACK";
/// Warning code: no process parameters for the month nor the month before.
pub const WARN_MISSING_PROCESS_PARAMS: &str = "MISSING_PROCESS_PARAMS";
/// Warning code: the piece has no steel, concrete or weight.
pub const WARN_MISSING_GEOMETRY: &str = "MISSING_GEOMETRY";
/// Warning code: the piece has no formula lines.
pub const WARN_EMPTY_FORMULA: &str = "EMPTY_FORMULA";
/// Warning code: a cost term is too large to represent.
pub const WARN_COST_OVERFLOW: &str = "COST_OVERFLOW";

/// A warning attached to a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownWarning {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl BreakdownWarning {
    pub(crate) fn new(code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
        }
    }
}

/// Cost contribution of one formula line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialCostLine {
    /// The formula line this cost comes from.
    pub line_id: i64,
    /// The consumed material.
    pub material_id: String,
    /// Quantity per unit before waste.
    pub quantity_per_unit: Decimal,
    /// Waste fraction.
    pub waste_factor: Decimal,
    /// Quantity per unit including waste.
    pub gross_quantity: Decimal,
    /// Resolved unit price, `None` when no price applies on the date.
    pub unit_price: Option<Decimal>,
    /// First day of the price row that was used.
    pub price_valid_from: Option<NaiveDate>,
    /// `gross_quantity × unit_price`, zero when unpriced.
    pub cost: Decimal,
}

/// Per-ton process terms, each already multiplied by the piece weight.
///
/// Terms disabled by the zone's cost model are reported as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCostTerms {
    /// Energy.
    pub energy: Decimal,
    /// Factory overhead.
    pub overhead_factory: Decimal,
    /// Company overhead.
    pub overhead_company: Decimal,
    /// Engineering.
    pub engineering: Decimal,
    /// Profit.
    pub profit: Decimal,
}

impl ProcessCostTerms {
    /// Sum of all terms, or `None` when it overflows.
    pub fn total(&self) -> Option<Decimal> {
        [
            self.overhead_factory,
            self.overhead_company,
            self.engineering,
            self.profit,
        ]
        .into_iter()
        .try_fold(self.energy, |sum, term| sum.checked_add(term))
    }
}

/// The full cost/price breakdown of a piece in a zone as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// The piece.
    pub piece_id: String,
    /// The zone.
    pub zone_id: String,
    /// The as-of date every value was resolved for.
    pub as_of: NaiveDate,
    /// Per-line material costs, in formula order.
    pub material_lines: Vec<MaterialCostLine>,
    /// Σ of the material line costs.
    pub materials_cost: Decimal,
    /// Per-ton process terms.
    pub process_terms: ProcessCostTerms,
    /// Σ of the process terms.
    pub process_cost: Decimal,
    /// Labor cost driven by the concrete volume.
    pub labor_concrete: Decimal,
    /// Labor cost driven by the steel content.
    pub labor_steel: Decimal,
    /// materials + process + labor, rounded to the zone's scale.
    pub total: Decimal,
    /// The month whose process parameters were applied, if any.
    pub process_month: Option<NaiveDate>,
    /// True when the previous month's process parameters were used.
    pub fallback: bool,
    /// Materials without a resolvable price, in formula order.
    pub missing_prices: Vec<String>,
    /// True when the piece has no geometry to derive process/labor cost from.
    pub missing_geom: bool,
    /// True when no process parameters applied, even after fallback.
    pub missing_process_params: bool,
    /// True when a cost term overflowed and was counted as zero.
    #[serde(default)]
    pub overflow: bool,
    /// Human-readable warnings for every data gap.
    pub warnings: Vec<BreakdownWarning>,
    /// The published unit price resolved as of the same date, if any.
    pub published_price: Option<Decimal>,
}

impl CostBreakdown {
    /// True when every material was priced and no term overflowed, so the
    /// total may be published.
    pub fn is_publishable(&self) -> bool {
        self.missing_prices.is_empty() && !self.overflow
    }
}
