//! Bill-of-materials models.
//!
//! A formula is the current set of [`BomLine`]s of a piece. It is not
//! versioned: breakdowns for past dates re-evaluate the current lines
//! against the prices that were valid then.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored line of a piece's formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    /// Store-assigned identifier.
    pub id: i64,
    /// The piece this line belongs to.
    pub piece_id: String,
    /// The material consumed.
    pub material_id: String,
    /// Quantity of material per produced unit, in the material's unit.
    pub quantity_per_unit: Decimal,
    /// Extra fraction consumed as waste (0.05 = 5%).
    pub waste_factor: Decimal,
}

impl BomLine {
    /// Quantity including waste: `quantity × (1 + waste)`, or `None` when
    /// the product does not fit a `Decimal`.
    pub fn gross_quantity(&self) -> Option<Decimal> {
        Decimal::ONE
            .checked_add(self.waste_factor)
            .and_then(|factor| self.quantity_per_unit.checked_mul(factor))
    }
}

/// A formula line as supplied by a caller, before it is stored.
///
/// # Example
///
/// ```
/// use precast_pricing::models::BomLineInput;
///
/// let line: BomLineInput = serde_json::from_str(
///     r#"{"material_id": "REBAR-12", "quantity_per_unit": "85.5"}"#,
/// ).unwrap();
/// assert!(line.waste_factor.is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLineInput {
    /// The material consumed.
    pub material_id: String,
    /// Quantity per produced unit; must be strictly positive.
    pub quantity_per_unit: Decimal,
    /// Waste fraction; must not be negative.
    #[serde(default)]
    pub waste_factor: Decimal,
}

impl From<&BomLine> for BomLineInput {
    fn from(line: &BomLine) -> Self {
        BomLineInput {
            material_id: line.material_id.clone(),
            quantity_per_unit: line.quantity_per_unit,
            waste_factor: line.waste_factor,
        }
    }
}

/// One problem found while validating a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaIssue {
    /// Zero-based index of the offending line, when the issue is line-specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_index: Option<usize>,
    /// Machine-readable code (e.g. `NON_POSITIVE_QUANTITY`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl FormulaIssue {
    pub(crate) fn at(line_index: usize, code: &str, message: String) -> Self {
        Self {
            line_index: Some(line_index),
            code: code.to_string(),
            message,
        }
    }

    pub(crate) fn general(code: &str, message: String) -> Self {
        Self {
            line_index: None,
            code: code.to_string(),
            message,
        }
    }
}

/// Outcome of validating a formula. Errors block a save, warnings do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaValidation {
    /// True when there are no errors.
    pub valid: bool,
    /// Blocking problems.
    pub errors: Vec<FormulaIssue>,
    /// Non-blocking problems to surface to the user.
    pub warnings: Vec<FormulaIssue>,
}

impl FormulaValidation {
    pub(crate) fn from_issues(errors: Vec<FormulaIssue>, warnings: Vec<FormulaIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// A formula together with the warnings raised when it was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// The piece the formula belongs to.
    pub piece_id: String,
    /// The stored lines, in insertion order.
    pub lines: Vec<BomLine>,
    /// Soft warnings (duplicate materials, high waste, ...).
    #[serde(default)]
    pub warnings: Vec<FormulaIssue>,
}
