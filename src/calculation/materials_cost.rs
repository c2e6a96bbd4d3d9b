//! Materials cost calculation.
//!
//! Each formula line is priced with the material's zone price resolved as of
//! the breakdown date. An unpriced line costs nothing and its material is
//! reported as missing.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{BomLine, MaterialCostLine, MaterialZonePrice};

use super::resolve_as_of;

/// The result of pricing a formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialsCostResult {
    /// Per-line costs, in formula order.
    pub lines: Vec<MaterialCostLine>,
    /// Σ `quantity × (1 + waste) × price` over priced lines.
    pub total: Decimal,
    /// Materials without an applicable price, deduplicated, in formula order.
    pub missing_prices: Vec<String>,
    /// Materials whose cost overflowed and was counted as zero.
    pub overflowed: Vec<String>,
}

/// Prices every formula line as of `as_of`.
///
/// `prices` holds the zone's price rows for (at least) the formula's
/// materials; rows of other materials are ignored.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, Utc};
/// use precast_pricing::calculation::calculate_materials_cost;
/// use precast_pricing::models::{BomLine, MaterialZonePrice};
/// use rust_decimal::Decimal;
///
/// let line = BomLine {
///     id: 1,
///     piece_id: "P".to_string(),
///     material_id: "A".to_string(),
///     quantity_per_unit: Decimal::from(2),
///     waste_factor: Decimal::new(1, 1),
/// };
/// let price = MaterialZonePrice {
///     id: 1,
///     material_id: "A".to_string(),
///     zone_id: "Z".to_string(),
///     price: Decimal::from(10),
///     valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     valid_until: None,
///     active: true,
///     created_by: "system".to_string(),
///     created_at: Utc::now(),
/// };
///
/// let as_of = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let result = calculate_materials_cost(&[line], &[price], as_of);
/// assert_eq!(result.total, Decimal::from(22));
/// assert!(result.missing_prices.is_empty());
/// ```
pub fn calculate_materials_cost(
    bom: &[BomLine],
    prices: &[MaterialZonePrice],
    as_of: NaiveDate,
) -> MaterialsCostResult {
    let mut lines = Vec::with_capacity(bom.len());
    let mut missing_prices: Vec<String> = Vec::new();
    let mut overflowed: Vec<String> = Vec::new();
    let mut total = Decimal::ZERO;

    for line in bom {
        let resolved = resolve_as_of(
            prices.iter().filter(|p| p.material_id == line.material_id),
            as_of,
        );
        let gross_quantity = line.gross_quantity();

        let cost = match resolved {
            Some(price) => gross_quantity.and_then(|qty| qty.checked_mul(price.price)),
            None => {
                if !missing_prices.contains(&line.material_id) {
                    missing_prices.push(line.material_id.clone());
                }
                Some(Decimal::ZERO)
            }
        };
        let cost = match cost.and_then(|cost| total.checked_add(cost).map(|sum| (cost, sum))) {
            Some((cost, sum)) => {
                total = sum;
                cost
            }
            None => {
                if !overflowed.contains(&line.material_id) {
                    overflowed.push(line.material_id.clone());
                }
                Decimal::ZERO
            }
        };

        lines.push(MaterialCostLine {
            line_id: line.id,
            material_id: line.material_id.clone(),
            quantity_per_unit: line.quantity_per_unit,
            waste_factor: line.waste_factor,
            gross_quantity: gross_quantity.unwrap_or(Decimal::ZERO),
            unit_price: resolved.map(|p| p.price),
            price_valid_from: resolved.map(|p| p.valid_from),
            cost,
        });
    }

    MaterialsCostResult {
        lines,
        total,
        missing_prices,
        overflowed,
    }
}
