//! Process and labor cost calculation.
//!
//! Process terms are rates per ton applied to the piece weight. Labor is
//! split by what drives it: hours per cubic metre of concrete and hours per
//! ton of reinforcing steel, both at the zone's hourly labor rate.

use rust_decimal::Decimal;

use crate::config::CostModel;
use crate::models::{Piece, ProcessCostTerms, ProcessRates};

/// Kilograms per metric ton.
pub const KG_PER_TON: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Labor cost of one unit, split by driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaborCost {
    /// `hours_per_m3_concrete × labor_rate × m3_concrete_per_unit`.
    pub concrete: Decimal,
    /// `hours_per_ton_steel × labor_rate × kg_steel_per_unit / 1000`.
    pub steel: Decimal,
}

/// Computes the per-ton process terms for one unit of `piece`.
///
/// Energy always applies; the other terms only when the zone's cost model
/// enables them. Returns `None` when a term overflows.
///
/// # Example
///
/// ```
/// use precast_pricing::calculation::calculate_process_terms;
/// use precast_pricing::config::CostModel;
/// use precast_pricing::models::{Piece, ProcessRates};
/// use rust_decimal::Decimal;
///
/// let piece = Piece {
///     id: "P".to_string(),
///     name: "Panel".to_string(),
///     kg_steel_per_unit: None,
///     m3_concrete_per_unit: None,
///     ton_weight_per_unit: Some(Decimal::from(2)),
/// };
/// let rates = ProcessRates {
///     energy_per_ton: Decimal::from(50),
///     profit_per_ton: Decimal::from(30),
///     ..ProcessRates::default()
/// };
/// let model = CostModel { include_profit: false, ..CostModel::default() };
///
/// let terms = calculate_process_terms(&rates, &piece, &model).unwrap();
/// assert_eq!(terms.energy, Decimal::from(100));
/// assert_eq!(terms.profit, Decimal::ZERO);
/// ```
pub fn calculate_process_terms(
    rates: &ProcessRates,
    piece: &Piece,
    model: &CostModel,
) -> Option<ProcessCostTerms> {
    let ton = piece.ton_weight();
    let per_ton = |enabled: bool, rate: Decimal| {
        if enabled {
            rate.checked_mul(ton)
        } else {
            Some(Decimal::ZERO)
        }
    };

    Some(ProcessCostTerms {
        energy: rates.energy_per_ton.checked_mul(ton)?,
        overhead_factory: per_ton(model.include_overhead_factory, rates.overhead_factory_per_ton)?,
        overhead_company: per_ton(model.include_overhead_company, rates.overhead_company_per_ton)?,
        engineering: per_ton(model.include_engineering, rates.engineering_per_ton)?,
        profit: per_ton(model.include_profit, rates.profit_per_ton)?,
    })
}

/// Computes the labor cost of one unit of `piece`, or `None` on overflow.
pub fn calculate_labor_cost(rates: &ProcessRates, piece: &Piece) -> Option<LaborCost> {
    let steel_tons = piece.kg_steel().checked_div(KG_PER_TON)?;
    Some(LaborCost {
        concrete: rates
            .hours_per_m3_concrete
            .checked_mul(rates.labor_rate_per_hour)?
            .checked_mul(piece.m3_concrete())?,
        steel: rates
            .hours_per_ton_steel
            .checked_mul(rates.labor_rate_per_hour)?
            .checked_mul(steel_tons)?,
    })
}
