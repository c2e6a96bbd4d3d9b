//! Formula (bill of materials) validation.
//!
//! Errors block a save. Warnings are returned to the caller but the formula
//! is still accepted.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{BomLineInput, FormulaIssue, FormulaValidation};

/// Error: the line's material does not exist.
pub const ISSUE_UNKNOWN_MATERIAL: &str = "UNKNOWN_MATERIAL";
/// Error: the line's quantity is zero or negative.
pub const ISSUE_NON_POSITIVE_QUANTITY: &str = "NON_POSITIVE_QUANTITY";
/// Error: the line's waste factor is negative.
pub const ISSUE_NEGATIVE_WASTE: &str = "NEGATIVE_WASTE_FACTOR";
/// Warning: the same material appears on more than one line.
pub const ISSUE_DUPLICATE_MATERIAL: &str = "DUPLICATE_MATERIAL";
/// Warning: the waste factor exceeds the configured threshold.
pub const ISSUE_HIGH_WASTE_FACTOR: &str = "HIGH_WASTE_FACTOR";
/// Warning: the formula has no lines.
pub const ISSUE_EMPTY_FORMULA: &str = "EMPTY_FORMULA";

/// Validates a set of formula lines.
///
/// `is_known_material` answers whether a material id exists; the check is
/// injected so validation stays independent of the store.
///
/// # Example
///
/// ```
/// use precast_pricing::calculation::validate_formula_lines;
/// use precast_pricing::models::BomLineInput;
/// use rust_decimal::Decimal;
///
/// let lines = vec![BomLineInput {
///     material_id: "CEM-I".to_string(),
///     quantity_per_unit: Decimal::ZERO,
///     waste_factor: Decimal::ZERO,
/// }];
/// let result = validate_formula_lines(&lines, |_| true, Decimal::new(5, 1));
/// assert!(!result.valid);
/// assert_eq!(result.errors[0].code, "NON_POSITIVE_QUANTITY");
/// ```
pub fn validate_formula_lines<F>(
    lines: &[BomLineInput],
    is_known_material: F,
    high_waste_factor: Decimal,
) -> FormulaValidation
where
    F: Fn(&str) -> bool,
{
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if lines.is_empty() {
        warnings.push(FormulaIssue::general(
            ISSUE_EMPTY_FORMULA,
            "Formula has no lines".to_string(),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (index, line) in lines.iter().enumerate() {
        if !is_known_material(&line.material_id) {
            errors.push(FormulaIssue::at(
                index,
                ISSUE_UNKNOWN_MATERIAL,
                format!("Material {} does not exist", line.material_id),
            ));
        }

        if line.quantity_per_unit <= Decimal::ZERO {
            errors.push(FormulaIssue::at(
                index,
                ISSUE_NON_POSITIVE_QUANTITY,
                format!(
                    "Quantity for {} must be greater than zero, got {}",
                    line.material_id, line.quantity_per_unit
                ),
            ));
        }

        if line.waste_factor < Decimal::ZERO {
            errors.push(FormulaIssue::at(
                index,
                ISSUE_NEGATIVE_WASTE,
                format!(
                    "Waste factor for {} must not be negative, got {}",
                    line.material_id, line.waste_factor
                ),
            ));
        } else if line.waste_factor > high_waste_factor {
            warnings.push(FormulaIssue::at(
                index,
                ISSUE_HIGH_WASTE_FACTOR,
                format!(
                    "Waste factor {} for {} is above {}",
                    line.waste_factor, line.material_id, high_waste_factor
                ),
            ));
        }

        if !seen.insert(line.material_id.as_str()) {
            warnings.push(FormulaIssue::at(
                index,
                ISSUE_DUPLICATE_MATERIAL,
                format!("Material {} appears on more than one line", line.material_id),
            ));
        }
    }

    FormulaValidation::from_issues(errors, warnings)
}
