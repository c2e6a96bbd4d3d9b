//! Cost breakdown assembly.
//!
//! Combines the materials cost, the process terms and the labor cost of a
//! piece into one [`CostBreakdown`]. Every data gap is reported as a flag and
//! a warning; the calculation itself never fails.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::CostModel;
use crate::models::{
    BomLine, BreakdownWarning, CostBreakdown, MaterialZonePrice, Piece, PieceZonePrice,
    ProcessCostTerms, ProcessParameters, WARN_COST_OVERFLOW, WARN_EMPTY_FORMULA, WARN_MISSING_GEOMETRY,
    WARN_MISSING_MATERIAL_PRICE, WARN_MISSING_PROCESS_PARAMS, WARN_PROCESS_PARAMS_FALLBACK,
};

use super::{
    LaborCost, calculate_labor_cost, calculate_materials_cost, calculate_process_terms,
    resolve_as_of, resolve_process_parameters,
};

/// Everything the calculator reads, already loaded from the ledgers.
#[derive(Debug, Clone, Copy)]
pub struct BreakdownInputs<'a> {
    /// The piece and its geometry.
    pub piece: &'a Piece,
    /// The production zone.
    pub zone_id: &'a str,
    /// The date every value is resolved for.
    pub as_of: NaiveDate,
    /// The piece's current formula.
    pub bom: &'a [BomLine],
    /// The zone's price rows for the formula's materials.
    pub material_prices: &'a [MaterialZonePrice],
    /// The zone's process parameter rows.
    pub process_parameters: &'a [ProcessParameters],
    /// The piece's published prices in the zone.
    pub published_prices: &'a [PieceZonePrice],
}

/// Calculates the cost breakdown of one unit of a piece.
///
/// This is a pure function of its inputs. A term too large for a `Decimal`
/// counts as zero and sets `overflow`, which blocks publishing.
pub fn calculate_breakdown(inputs: BreakdownInputs<'_>, model: &CostModel) -> CostBreakdown {
    let mut warnings = Vec::new();

    if inputs.bom.is_empty() {
        warnings.push(BreakdownWarning::new(
            WARN_EMPTY_FORMULA,
            format!("Piece {} has no formula lines", inputs.piece.id),
        ));
    }

    let materials = calculate_materials_cost(inputs.bom, inputs.material_prices, inputs.as_of);
    for material_id in &materials.missing_prices {
        warnings.push(BreakdownWarning::new(
            WARN_MISSING_MATERIAL_PRICE,
            format!(
                "No price for material {} in zone {} as of {}",
                material_id, inputs.zone_id, inputs.as_of
            ),
        ));
    }
    if !materials.overflowed.is_empty() {
        warnings.push(BreakdownWarning::new(
            WARN_COST_OVERFLOW,
            format!(
                "Cost of material(s) {} is too large to represent",
                materials.overflowed.join(", ")
            ),
        ));
    }
    let mut overflow = !materials.overflowed.is_empty();

    let missing_geom = inputs.piece.is_missing_geometry();
    if missing_geom {
        warnings.push(BreakdownWarning::new(
            WARN_MISSING_GEOMETRY,
            format!(
                "Piece {} has no steel, concrete or weight; process and labor cost are zero",
                inputs.piece.id
            ),
        ));
    }

    let resolved = resolve_process_parameters(inputs.process_parameters, inputs.as_of);
    let (process_terms, labor, process_month, fallback) = match &resolved {
        Some(resolved) => {
            let rates = &resolved.parameters.rates;
            if resolved.fallback {
                warnings.push(BreakdownWarning::new(
                    WARN_PROCESS_PARAMS_FALLBACK,
                    format!(
                        "No process parameters for {} in zone {}; using {}",
                        resolved.requested_month.format("%Y-%m"),
                        inputs.zone_id,
                        resolved.parameters.month.format("%Y-%m")
                    ),
                ));
            }
            let terms = calculate_process_terms(rates, inputs.piece, model);
            let labor = calculate_labor_cost(rates, inputs.piece);
            if terms.is_none() || labor.is_none() {
                overflow = true;
                warnings.push(BreakdownWarning::new(
                    WARN_COST_OVERFLOW,
                    format!(
                        "Process or labor cost of piece {} is too large to represent",
                        inputs.piece.id
                    ),
                ));
            }
            (
                terms.unwrap_or_default(),
                labor.unwrap_or_default(),
                Some(resolved.parameters.month),
                resolved.fallback,
            )
        }
        None => {
            warnings.push(BreakdownWarning::new(
                WARN_MISSING_PROCESS_PARAMS,
                format!(
                    "No process parameters for zone {} in {} or the month before",
                    inputs.zone_id,
                    inputs.as_of.format("%Y-%m")
                ),
            ));
            (ProcessCostTerms::default(), LaborCost::default(), None, false)
        }
    };

    let sum = process_terms.total().and_then(|process_cost| {
        [process_cost, labor.concrete, labor.steel]
            .into_iter()
            .try_fold(materials.total, |sum, term| sum.checked_add(term))
            .map(|total| (process_cost, total))
    });
    let (process_cost, total) = match sum {
        Some((process_cost, total)) => (process_cost, round_total(total, model.rounding_scale)),
        None => {
            overflow = true;
            warnings.push(BreakdownWarning::new(
                WARN_COST_OVERFLOW,
                format!("Total cost of piece {} is too large to represent", inputs.piece.id),
            ));
            (Decimal::ZERO, Decimal::ZERO)
        }
    };

    let published_price =
        resolve_as_of(inputs.published_prices, inputs.as_of).map(PieceZonePrice::unit_price);

    CostBreakdown {
        piece_id: inputs.piece.id.clone(),
        zone_id: inputs.zone_id.to_string(),
        as_of: inputs.as_of,
        material_lines: materials.lines,
        materials_cost: materials.total,
        process_terms,
        process_cost,
        labor_concrete: labor.concrete,
        labor_steel: labor.steel,
        total,
        process_month,
        fallback,
        missing_prices: materials.missing_prices,
        missing_geom,
        missing_process_params: resolved.is_none(),
        overflow,
        warnings,
        published_price,
    }
}

/// Rounds a total to `scale` decimals, midpoints away from zero.
pub fn round_total(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProcessRates;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn piece() -> Piece {
        Piece {
            id: "P1".to_string(),
            name: "Hollow core slab".to_string(),
            kg_steel_per_unit: Some(dec("120")),
            m3_concrete_per_unit: Some(dec("0.8")),
            ton_weight_per_unit: Some(dec("2")),
        }
    }

    fn bom() -> Vec<BomLine> {
        vec![
            BomLine {
                id: 1,
                piece_id: "P1".to_string(),
                material_id: "A".to_string(),
                quantity_per_unit: dec("2"),
                waste_factor: dec("0.1"),
            },
            BomLine {
                id: 2,
                piece_id: "P1".to_string(),
                material_id: "B".to_string(),
                quantity_per_unit: dec("1"),
                waste_factor: Decimal::ZERO,
            },
        ]
    }

    fn material_price(id: i64, material: &str, price: &str) -> MaterialZonePrice {
        MaterialZonePrice {
            id,
            material_id: material.to_string(),
            zone_id: "Z1".to_string(),
            price: dec(price),
            valid_from: date(2024, 1, 1),
            valid_until: None,
            active: true,
            created_by: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    fn params(month: NaiveDate) -> ProcessParameters {
        ProcessParameters {
            zone_id: "Z1".to_string(),
            month,
            rates: ProcessRates {
                energy_per_ton: dec("50"),
                overhead_factory_per_ton: dec("20"),
                overhead_company_per_ton: dec("10"),
                profit_per_ton: dec("30"),
                engineering_per_ton: dec("5"),
                labor_rate_per_hour: dec("25"),
                hours_per_ton_steel: dec("12"),
                hours_per_m3_concrete: dec("3"),
            },
            updated_by: "system".to_string(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn codes(breakdown: &CostBreakdown) -> Vec<&str> {
        breakdown.warnings.iter().map(|w| w.code.as_str()).collect()
    }

    #[test]
    fn test_complete_breakdown() {
        let piece = piece();
        let bom = bom();
        let prices = vec![material_price(1, "A", "10.00"), material_price(2, "B", "5.00")];
        let process = vec![params(date(2024, 1, 1))];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 1, 15),
                bom: &bom,
                material_prices: &prices,
                process_parameters: &process,
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert_eq!(breakdown.materials_cost, dec("27.00"));
        assert_eq!(breakdown.process_cost, dec("230"));
        assert_eq!(breakdown.labor_concrete, dec("60"));
        assert_eq!(breakdown.labor_steel, dec("36"));
        assert_eq!(breakdown.total, dec("353.00"));
        assert_eq!(breakdown.process_month, Some(date(2024, 1, 1)));
        assert!(!breakdown.fallback);
        assert!(!breakdown.missing_process_params);
        assert!(breakdown.warnings.is_empty());
        assert!(breakdown.is_publishable());
    }

    #[test]
    fn test_previous_month_fallback_is_flagged() {
        let piece = piece();
        let process = vec![params(date(2024, 1, 1))];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 2, 10),
                bom: &[],
                material_prices: &[],
                process_parameters: &process,
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert!(breakdown.fallback);
        assert_eq!(breakdown.process_terms.energy, dec("100"));
        assert_eq!(breakdown.process_month, Some(date(2024, 1, 1)));
        assert!(codes(&breakdown).contains(&WARN_PROCESS_PARAMS_FALLBACK));
        assert!(codes(&breakdown).contains(&WARN_EMPTY_FORMULA));
    }

    #[test]
    fn test_missing_process_params_zero_process_and_labor() {
        let piece = piece();
        let process = vec![params(date(2023, 11, 1))];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 2, 10),
                bom: &[],
                material_prices: &[],
                process_parameters: &process,
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert!(breakdown.missing_process_params);
        assert!(!breakdown.fallback);
        assert_eq!(breakdown.process_cost, Decimal::ZERO);
        assert_eq!(breakdown.labor_steel, Decimal::ZERO);
        assert_eq!(breakdown.process_month, None);
        assert!(codes(&breakdown).contains(&WARN_MISSING_PROCESS_PARAMS));
    }

    #[test]
    fn test_missing_price_and_geometry_are_reported() {
        let piece = Piece {
            kg_steel_per_unit: None,
            m3_concrete_per_unit: Some(Decimal::ZERO),
            ton_weight_per_unit: None,
            ..piece()
        };
        let bom = bom();
        let prices = vec![material_price(1, "A", "10.00")];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 1, 15),
                bom: &bom,
                material_prices: &prices,
                process_parameters: &[],
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert!(breakdown.missing_geom);
        assert_eq!(breakdown.missing_prices, vec!["B".to_string()]);
        assert!(!breakdown.is_publishable());
        assert_eq!(breakdown.total, dec("22.00"));
        assert!(codes(&breakdown).contains(&WARN_MISSING_MATERIAL_PRICE));
        assert!(codes(&breakdown).contains(&WARN_MISSING_GEOMETRY));
    }

    #[test]
    fn test_zone_cost_model_excludes_terms() {
        let piece = piece();
        let process = vec![params(date(2024, 1, 1))];
        let model = CostModel {
            include_engineering: false,
            include_profit: false,
            ..CostModel::default()
        };

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 1, 15),
                bom: &[],
                material_prices: &[],
                process_parameters: &process,
                published_prices: &[],
            },
            &model,
        );

        assert_eq!(breakdown.process_terms.engineering, Decimal::ZERO);
        assert_eq!(breakdown.process_terms.profit, Decimal::ZERO);
        assert_eq!(breakdown.process_cost, dec("160"));
    }

    #[test]
    fn test_published_price_resolved_as_of_date() {
        let piece = piece();
        let published = vec![
            PieceZonePrice {
                id: 1,
                piece_id: "P1".to_string(),
                zone_id: "Z1".to_string(),
                effective_date: date(2024, 1, 1),
                base_price: dec("300"),
                adjustment: dec("5"),
                created_by: "system".to_string(),
                updated_at: Utc::now(),
            },
            PieceZonePrice {
                id: 2,
                piece_id: "P1".to_string(),
                zone_id: "Z1".to_string(),
                effective_date: date(2024, 3, 1),
                base_price: dec("320"),
                adjustment: Decimal::ZERO,
                created_by: "system".to_string(),
                updated_at: Utc::now(),
            },
        ];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 2, 15),
                bom: &[],
                material_prices: &[],
                process_parameters: &[],
                published_prices: &published,
            },
            &CostModel::default(),
        );

        assert_eq!(breakdown.published_price, Some(dec("305")));
    }

    #[test]
    fn test_overflowing_material_cost_is_flagged_not_panicking() {
        let piece = piece();
        let bom = vec![BomLine {
            quantity_per_unit: dec("100000000000000000000"),
            ..bom().remove(0)
        }];
        let prices = vec![material_price(1, "A", "100000000000000000000")];
        let process = vec![params(date(2024, 1, 1))];

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 1, 15),
                bom: &bom,
                material_prices: &prices,
                process_parameters: &process,
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert!(breakdown.overflow);
        assert!(!breakdown.is_publishable());
        assert_eq!(breakdown.materials_cost, Decimal::ZERO);
        assert_eq!(breakdown.total, dec("326.00"));
        assert!(codes(&breakdown).contains(&WARN_COST_OVERFLOW));
    }

    #[test]
    fn test_overflowing_process_rates_are_flagged() {
        let piece = piece();
        let mut process = params(date(2024, 1, 1));
        process.rates.energy_per_ton = dec("70000000000000000000000000000");

        let breakdown = calculate_breakdown(
            BreakdownInputs {
                piece: &piece,
                zone_id: "Z1",
                as_of: date(2024, 1, 15),
                bom: &[],
                material_prices: &[],
                process_parameters: &[process],
                published_prices: &[],
            },
            &CostModel::default(),
        );

        assert!(breakdown.overflow);
        assert_eq!(breakdown.process_cost, Decimal::ZERO);
        assert!(codes(&breakdown).contains(&WARN_COST_OVERFLOW));
    }

    #[test]
    fn test_round_total_midpoint_away_from_zero() {
        assert_eq!(round_total(dec("10.125"), 2), dec("10.13"));
        assert_eq!(round_total(dec("10.135"), 2), dec("10.14"));
        assert_eq!(round_total(dec("-10.125"), 2), dec("-10.13"));
        assert_eq!(round_total(dec("10.5"), 0), dec("11"));
    }
}
