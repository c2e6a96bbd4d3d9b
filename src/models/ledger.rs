//! Time-versioned ledger records.
//!
//! Material prices, process parameters and published piece prices all change
//! over time. Each record carries the date it takes effect from; the
//! temporal resolver in [`crate::calculation`] picks the one that applies
//! on a given as-of date.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A unit price of a material in a zone, valid over a date window.
///
/// Rows are never deleted. A newer price supersedes an older one by closing
/// the older row's `valid_until`; a row can also be deactivated outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialZonePrice {
    /// Store-assigned identifier; increases with creation order.
    pub id: i64,
    /// The priced material.
    pub material_id: String,
    /// The zone the price applies in.
    pub zone_id: String,
    /// Unit price in the material's unit of measure.
    pub price: Decimal,
    /// First day the price applies (inclusive).
    pub valid_from: NaiveDate,
    /// Last day the price applies (inclusive); open-ended when `None`.
    pub valid_until: Option<NaiveDate>,
    /// Inactive rows are kept for the record but never resolved.
    pub active: bool,
    /// The user who recorded the price.
    pub created_by: String,
    /// When the row was recorded.
    pub created_at: DateTime<Utc>,
}

/// A material price about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMaterialPrice {
    /// The priced material.
    pub material_id: String,
    /// The zone the price applies in.
    pub zone_id: String,
    /// Unit price; must not be negative.
    pub price: Decimal,
    /// First day the price applies.
    pub valid_from: NaiveDate,
    /// Optional last day the price applies.
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// The rate inputs of a zone for one month.
///
/// Per-ton terms are applied to the piece weight, labor hours to the steel
/// and concrete content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRates {
    /// Energy cost per ton of finished piece.
    pub energy_per_ton: Decimal,
    /// Factory overhead per ton.
    pub overhead_factory_per_ton: Decimal,
    /// Company overhead per ton.
    pub overhead_company_per_ton: Decimal,
    /// Profit margin per ton.
    pub profit_per_ton: Decimal,
    /// Engineering cost per ton.
    pub engineering_per_ton: Decimal,
    /// Labor cost per hour.
    pub labor_rate_per_hour: Decimal,
    /// Labor hours per ton of reinforcing steel.
    pub hours_per_ton_steel: Decimal,
    /// Labor hours per cubic metre of concrete.
    pub hours_per_m3_concrete: Decimal,
}

impl ProcessRates {
    /// Names of the fields holding a negative value.
    pub fn negative_fields(&self) -> Vec<&'static str> {
        [
            ("energy_per_ton", self.energy_per_ton),
            ("overhead_factory_per_ton", self.overhead_factory_per_ton),
            ("overhead_company_per_ton", self.overhead_company_per_ton),
            ("profit_per_ton", self.profit_per_ton),
            ("engineering_per_ton", self.engineering_per_ton),
            ("labor_rate_per_hour", self.labor_rate_per_hour),
            ("hours_per_ton_steel", self.hours_per_ton_steel),
            ("hours_per_m3_concrete", self.hours_per_m3_concrete),
        ]
        .into_iter()
        .filter(|(_, value)| *value < Decimal::ZERO)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Process parameters stored for a (zone, month). At most one row per key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessParameters {
    /// The zone the parameters apply to.
    pub zone_id: String,
    /// First day of the calendar month the parameters apply to.
    pub month: NaiveDate,
    /// The rate values.
    #[serde(flatten)]
    pub rates: ProcessRates,
    /// The user who last wrote the row.
    pub updated_by: String,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Process parameters resolved for a requested month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProcessParameters {
    /// The month that was asked for.
    pub requested_month: NaiveDate,
    /// True when the requested month had no row and the previous month's
    /// row was used instead.
    pub fallback: bool,
    /// The row that was used (its `month` is the month actually applied).
    pub parameters: ProcessParameters,
}

/// A published unit sale price of a piece in a zone.
///
/// One row per (piece, zone, effective date); publishing again on the same
/// date overwrites the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceZonePrice {
    /// Store-assigned identifier.
    pub id: i64,
    /// The priced piece.
    pub piece_id: String,
    /// The zone the price applies in.
    pub zone_id: String,
    /// The date the price takes effect from.
    pub effective_date: NaiveDate,
    /// The base price (computed total or supplied value).
    pub base_price: Decimal,
    /// Commercial adjustment added on top of the base price.
    pub adjustment: Decimal,
    /// The user who published the price.
    pub created_by: String,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl PieceZonePrice {
    /// The unit sale price: base plus adjustment.
    ///
    /// Publishing rejects sums that overflow, so saturation only applies to
    /// rows written outside the engine.
    pub fn unit_price(&self) -> Decimal {
        self.base_price.saturating_add(self.adjustment)
    }
}

/// Where the price being published comes from.
///
/// # Example
///
/// ```
/// use precast_pricing::models::PriceLine;
/// use rust_decimal::Decimal;
///
/// let supplied: PriceLine = serde_json::from_str(
///     r#"{"source": "supplied", "base_price": "410.00"}"#,
/// ).unwrap();
/// assert_eq!(
///     supplied,
///     PriceLine::Supplied { base_price: Decimal::new(41000, 2), adjustment: Decimal::ZERO }
/// );
///
/// let computed: PriceLine = serde_json::from_str(r#"{"source": "computed"}"#).unwrap();
/// assert_eq!(computed, PriceLine::Computed { adjustment: Decimal::ZERO });
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceLine {
    /// The caller supplies the base price.
    Supplied {
        /// The base price to publish.
        base_price: Decimal,
        /// Adjustment added on top of the base price.
        #[serde(default)]
        adjustment: Decimal,
    },
    /// The base price is the breakdown total as of the effective date.
    Computed {
        /// Adjustment added on top of the computed total.
        #[serde(default)]
        adjustment: Decimal,
    },
}

impl PriceLine {
    /// Builds a price line from an optional caller-supplied price.
    pub fn from_optional(price: Option<Decimal>, adjustment: Option<Decimal>) -> Self {
        let adjustment = adjustment.unwrap_or(Decimal::ZERO);
        match price {
            Some(base_price) => PriceLine::Supplied {
                base_price,
                adjustment,
            },
            None => PriceLine::Computed { adjustment },
        }
    }

    /// The adjustment carried by either variant.
    pub fn adjustment(&self) -> Decimal {
        match self {
            PriceLine::Supplied { adjustment, .. } | PriceLine::Computed { adjustment } => {
                *adjustment
            }
        }
    }
}

/// A piece price about to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPieceZonePrice {
    /// The priced piece.
    pub piece_id: String,
    /// The zone the price applies in.
    pub zone_id: String,
    /// The date the price takes effect from.
    pub effective_date: NaiveDate,
    /// The base price.
    pub base_price: Decimal,
    /// Adjustment added on top of the base price.
    pub adjustment: Decimal,
    /// The publishing user.
    pub created_by: String,
}

/// A (zone, month) period frozen against further edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodClosing {
    /// The closed zone.
    pub zone_id: String,
    /// First day of the closed month.
    pub month: NaiveDate,
    /// The user who closed the period.
    pub closed_by: String,
    /// When the period was closed.
    pub closed_at: DateTime<Utc>,
}
